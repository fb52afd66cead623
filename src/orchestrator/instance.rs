// Sun Feb 22 2026 - Alex

use crate::config::InstanceConfig;
use crate::driver::Driver;
use crate::mapper::{DescriptorSource, GlobalHooks, MapperMetadata};
use crate::memory::{MemoryRange, MemoryStore, DEFAULT_NAMESPACE};
use crate::orchestrator::{CancellationToken, InstanceError, NotificationSink};
use crate::property::{
    ChangedFacets, Endianness, Property, PropertyEngine, PropertyRegistry, PropertySnapshot, PropertyValue,
    ReferenceTables,
};
use crate::resolver::Variables;
use crate::scripting::{HookContext, HookProvider, TransformRegistry};
use crate::utils::ScopedTimer;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const PRIMING_READS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Idle,
    Loading,
    Running,
    Resetting,
    Faulted,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceState::Idle => "idle",
            InstanceState::Loading => "loading",
            InstanceState::Running => "running",
            InstanceState::Resetting => "resetting",
            InstanceState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Everything that belongs to one loaded mapper and is thrown away on reset.
struct Session {
    metadata: MapperMetadata,
    endianness: Endianness,
    ranges: Vec<MemoryRange>,
    registry: PropertyRegistry,
    references: ReferenceTables,
    variables: Variables,
    memory: MemoryStore,
    hooks: GlobalHooks,
}

struct Inner {
    config: InstanceConfig,
    hooks: Arc<dyn HookProvider>,
    transforms: Arc<TransformRegistry>,
    sink: Arc<dyn NotificationSink>,
    driver: Mutex<Option<Arc<dyn Driver>>>,
    source: Mutex<Option<Arc<dyn DescriptorSource>>>,
    state: Mutex<InstanceState>,
    session: Mutex<Option<Session>>,
}

/// Ties a driver, a mapper and the property engine together and runs the poll loop.
pub struct Instance {
    inner: Arc<Inner>,
    token: Mutex<CancellationToken>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Instance {
    pub fn new(
        config: InstanceConfig,
        hooks: Arc<dyn HookProvider>,
        transforms: Arc<TransformRegistry>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                hooks,
                transforms,
                sink,
                driver: Mutex::new(None),
                source: Mutex::new(None),
                state: Mutex::new(InstanceState::Idle),
                session: Mutex::new(None),
            }),
            token: Mutex::new(CancellationToken::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> InstanceState {
        *self.inner.state.lock()
    }

    pub fn metadata(&self) -> Option<MapperMetadata> {
        self.inner.session.lock().as_ref().map(|s| s.metadata.clone())
    }

    /// Reset any previous session, load the mapper, prime the driver and start polling.
    pub fn load(&self, driver: Arc<dyn Driver>, source: Arc<dyn DescriptorSource>) -> Result<(), InstanceError> {
        self.stop();

        *self.inner.driver.lock() = Some(driver);
        *self.inner.source.lock() = Some(source);
        self.inner.open_session()?;

        let token = CancellationToken::new();
        *self.token.lock() = token.clone();
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("poll-loop".to_string())
            .spawn(move || poll_loop(inner, token))?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Cancel the loop, wait for it, and reset the session.
    pub fn stop(&self) {
        self.token.lock().cancel();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.inner.reset_session();
    }

    pub fn properties(&self) -> Vec<PropertySnapshot> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.registry.snapshots())
            .unwrap_or_default()
    }

    pub fn property(&self, path: &str) -> Option<PropertySnapshot> {
        self.inner
            .session
            .lock()
            .as_ref()
            .and_then(|s| s.registry.get(path))
            .map(Property::snapshot)
    }

    /// Parse `text` for the property's kind and write it.
    pub fn set_value(&self, path: &str, text: &str, freeze: bool) -> Result<(), InstanceError> {
        self.inner.with_property(path, |engine, property| {
            let value = PropertyValue::parse_text(property.kind(), text, property.descriptor().reference.is_some())?;
            engine.write_value(property, &value, freeze)?;
            Ok(())
        })
    }

    pub fn set_bytes(&self, path: &str, bytes: &[u8], freeze: bool) -> Result<(), InstanceError> {
        self.inner.with_property(path, |engine, property| {
            engine.write_bytes(property, bytes, freeze)?;
            Ok(())
        })
    }

    pub fn set_frozen(&self, path: &str, frozen: bool) -> Result<(), InstanceError> {
        self.inner.with_property(path, |engine, property| {
            engine.set_frozen(property, frozen)?;
            Ok(())
        })
    }

    /// Run a single cycle on the calling thread. Used by one-shot decoding.
    pub fn run_cycle(&self) -> Result<(), InstanceError> {
        self.inner.run_cycle()
    }

    /// Load without starting the background loop.
    pub fn load_once(&self, driver: Arc<dyn Driver>, source: Arc<dyn DescriptorSource>) -> Result<(), InstanceError> {
        self.stop();
        *self.inner.driver.lock() = Some(driver);
        *self.inner.source.lock() = Some(source);
        self.inner.open_session()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(inner: Arc<Inner>, token: CancellationToken) {
    loop {
        while !token.is_cancelled() {
            if let Err(e) = inner.run_cycle() {
                match &e {
                    InstanceError::Driver(driver) if driver.is_recoverable() => {
                        warn!("Poll cycle failed, resetting session: {}", e)
                    }
                    _ => error!("Poll cycle failed, resetting session: {}", e),
                }
                inner.report(|sink| sink.on_error(&e.to_string()));
                inner.reset_session();
                break;
            }
            if token.wait(inner.delay()) {
                return;
            }
        }

        if token.is_cancelled() {
            return;
        }
        if !inner.config.auto_reconnect {
            inner.set_state(InstanceState::Faulted);
            return;
        }

        loop {
            if token.wait(inner.config.reconnect_delay()) {
                return;
            }
            info!("Reconnecting");
            match inner.open_session() {
                Ok(()) => break,
                Err(e) => warn!("Reconnect failed: {}", e),
            }
        }
    }
}

impl Inner {
    fn set_state(&self, state: InstanceState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!("Instance {} -> {}", *current, state);
            *current = state;
        }
    }

    fn driver(&self) -> Result<Arc<dyn Driver>, InstanceError> {
        self.driver.lock().clone().ok_or(InstanceError::NotLoaded)
    }

    fn delay(&self) -> Duration {
        self.driver
            .lock()
            .as_ref()
            .map(|d| d.delay())
            .unwrap_or(Duration::from_millis(5))
    }

    fn report<F>(&self, call: F)
    where
        F: FnOnce(&dyn NotificationSink) -> anyhow::Result<()>,
    {
        if let Err(e) = call(self.sink.as_ref()) {
            warn!("Notification sink failed: {}", e);
        }
    }

    fn open_session(&self) -> Result<(), InstanceError> {
        self.set_state(InstanceState::Loading);
        match self.build_session() {
            Ok(session) => {
                let metadata = session.metadata.clone();
                *self.session.lock() = Some(session);
                self.set_state(InstanceState::Running);
                self.report(|sink| sink.on_mapper_loaded(&metadata));
                Ok(())
            }
            Err(e) => {
                if let Ok(driver) = self.driver() {
                    driver.disconnect();
                }
                self.set_state(InstanceState::Faulted);
                Err(e)
            }
        }
    }

    fn build_session(&self) -> Result<Session, InstanceError> {
        let driver = self.driver()?;
        let source = self.source.lock().clone().ok_or(InstanceError::NotLoaded)?;

        let definition = source.load()?;
        let compiled = definition.compile()?;
        info!(
            "Loading '{}' from {} ({} properties, {} ranges) via {}",
            compiled.metadata.game_name,
            source.describe(),
            compiled.registry.len(),
            compiled.ranges.len(),
            driver.name()
        );

        driver.establish_connection(&compiled.ranges)?;

        // The peer may clear or prime memory on its first answer; absorb it.
        let mut memory = compiled.memory_store();
        for _ in 0..PRIMING_READS {
            for block in driver.read_bytes(&compiled.ranges)? {
                memory.fill(DEFAULT_NAMESPACE, block.start, &block.data)?;
            }
        }

        Ok(Session {
            metadata: compiled.metadata,
            endianness: compiled.endianness,
            ranges: compiled.ranges,
            registry: compiled.registry,
            references: compiled.references,
            variables: compiled.variables,
            memory,
            hooks: compiled.hooks,
        })
    }

    /// Dispose the driver session and property state, then tell observers.
    fn reset_session(&self) {
        let previous = self.session.lock().take();
        if previous.is_none() {
            return;
        }

        self.set_state(InstanceState::Resetting);
        if let Ok(driver) = self.driver() {
            driver.disconnect();
        }
        warn!("Session reset");
        self.report(|sink| sink.on_session_reset());
        self.set_state(InstanceState::Idle);
    }

    fn run_cycle(&self) -> Result<(), InstanceError> {
        let _timer = ScopedTimer::new("poll cycle");
        let driver = self.driver()?;

        let ranges = match self.session.lock().as_ref() {
            Some(session) => session.ranges.clone(),
            None => return Err(InstanceError::NotLoaded),
        };
        let blocks = driver.read_bytes(&ranges)?;

        let changed = {
            let mut guard = self.session.lock();
            let session = guard.as_mut().ok_or(InstanceError::NotLoaded)?;
            let Session {
                endianness,
                registry,
                references,
                variables,
                memory,
                hooks: global,
                ..
            } = session;

            for block in blocks {
                memory.fill(DEFAULT_NAMESPACE, block.start, &block.data)?;
            }
            registry.clear_changes();

            if let Some(hook) = global.preprocessor.as_deref() {
                let mut ctx = HookContext::for_cycle(registry, memory, variables, &self.transforms);
                if self.hooks.call_boolean(hook, &mut ctx)? == Some(false) {
                    return Ok(());
                }
            }

            let problems = PropertyEngine::new(
                *endianness,
                memory,
                variables,
                references,
                &self.transforms,
                driver.as_ref(),
                self.hooks.as_ref(),
            )
            .process_all(registry);
            for problem in problems {
                self.report(|sink| sink.on_error(&format!("{}: {}", problem.path, problem.message)));
            }

            if let Some(hook) = global.postprocessor.as_deref() {
                let before: Vec<(PropertyValue, Option<Vec<u8>>)> = registry
                    .iter()
                    .map(|p| (p.value().clone(), p.bytes().map(|b| b.to_vec())))
                    .collect();

                let mut ctx = HookContext::for_cycle(registry, memory, variables, &self.transforms);
                if self.hooks.call_boolean(hook, &mut ctx)? == Some(false) {
                    return Ok(());
                }

                for (property, (value, bytes)) in registry.iter_mut().zip(before) {
                    if property.value() != &value {
                        property.state_mut().mark(ChangedFacets::VALUE);
                    }
                    if property.bytes().map(|b| b.to_vec()) != bytes {
                        property.state_mut().mark(ChangedFacets::BYTES);
                    }
                }
            }

            registry.changed()
        };

        if !changed.is_empty() {
            self.report(|sink| sink.on_properties_changed(&changed));
        }
        Ok(())
    }

    fn with_property<F>(&self, path: &str, write: F) -> Result<(), InstanceError>
    where
        F: FnOnce(&mut PropertyEngine<'_>, &mut Property) -> Result<(), InstanceError>,
    {
        let driver = self.driver()?;
        let snapshot = {
            let mut guard = self.session.lock();
            let session = guard.as_mut().ok_or(InstanceError::NotLoaded)?;
            let Session {
                endianness,
                registry,
                references,
                variables,
                memory,
                ..
            } = session;

            let property = registry
                .get_mut(path)
                .ok_or_else(|| InstanceError::UnknownProperty(path.to_string()))?;
            // Flags from the last cycle were already published.
            property.state_mut().clear_changes();
            let mut engine = PropertyEngine::new(
                *endianness,
                memory,
                variables,
                references,
                &self.transforms,
                driver.as_ref(),
                self.hooks.as_ref(),
            );
            write(&mut engine, property)?;

            if property.state().has_changes() {
                Some(property.snapshot())
            } else {
                None
            }
        };

        if let Some(snapshot) = snapshot {
            self.report(|sink| sink.on_properties_changed(std::slice::from_ref(&snapshot)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StaticDriver;
    use crate::mapper::MapperDefinition;
    use crate::memory::Address;
    use crate::orchestrator::{ChannelSink, LoggingSink, Notification};
    use crate::scripting::{FunctionHooks, NoHooks};
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Instant;

    fn mapper() -> MapperDefinition {
        serde_json::from_value(json!({
            "metadata": { "gameName": "Test Quest", "gamePlatform": "NES" },
            "platform": { "ranges": [{ "start": 0x100, "length": 16 }] },
            "properties": [
                { "path": "hp", "type": "uint", "address": "0x100", "length": 2 },
                { "path": "mp", "type": "uint", "address": "0x102" },
                { "path": "gold", "type": "uint", "address": "0x104", "length": 2 },
                { "path": "title", "type": "string", "staticValue": "Test Quest" }
            ]
        }))
        .unwrap()
    }

    fn driver() -> Arc<StaticDriver> {
        Arc::new(
            StaticDriver::new()
                .with_block(Address::new(0x100), vec![0x0A, 0x00, 5, 0, 0x10, 0x27, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])
                .with_delay(Duration::from_millis(1)),
        )
    }

    fn instance(hooks: Arc<dyn HookProvider>, auto_reconnect: bool) -> (Instance, Receiver<Notification>) {
        let (tx, rx) = mpsc::channel();
        let config = InstanceConfig {
            auto_reconnect,
            reconnect_delay_ms: 10,
        };
        let instance = Instance::new(config, hooks, Arc::new(TransformRegistry::default()), Arc::new(ChannelSink::new(tx)));
        (instance, rx)
    }

    fn next_changed(rx: &Receiver<Notification>) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(Notification::PropertiesChanged(batch)) = rx.recv_timeout(Duration::from_millis(50)) {
                return batch.into_iter().map(|s| s.path).collect();
            }
        }
        Vec::new()
    }

    fn wait_for(rx: &Receiver<Notification>, wanted: &Notification) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(notification) = rx.recv_timeout(Duration::from_millis(50)) {
                if &notification == wanted {
                    return true;
                }
            }
        }
        false
    }

    #[test]
    fn test_load_and_first_cycle() {
        let (instance, rx) = instance(Arc::new(NoHooks), false);
        instance.load_once(driver(), Arc::new(mapper())).unwrap();
        assert_eq!(instance.state(), InstanceState::Running);
        assert!(matches!(rx.try_recv(), Ok(Notification::MapperLoaded(_))));

        instance.run_cycle().unwrap();
        let changed = next_changed(&rx);
        assert_eq!(changed, vec!["hp", "mp", "gold", "title"]);
        assert_eq!(instance.property("hp").unwrap().value, PropertyValue::Integer(10));
        assert_eq!(instance.property("gold").unwrap().value, PropertyValue::Integer(10_000));

        instance.run_cycle().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_change_set_is_exact() {
        let (instance, rx) = instance(Arc::new(NoHooks), false);
        let driver = driver();
        instance.load_once(driver.clone(), Arc::new(mapper())).unwrap();
        instance.run_cycle().unwrap();
        next_changed(&rx);

        driver.poke(Address::new(0x100), &[0x14, 0x00]).unwrap();
        driver.poke(Address::new(0x104), &[0x11, 0x27]).unwrap();
        instance.run_cycle().unwrap();
        assert_eq!(next_changed(&rx), vec!["hp", "gold"]);
        assert_eq!(instance.property("hp").unwrap().value, PropertyValue::Integer(20));
    }

    #[test]
    fn test_background_loop_publishes_changes() {
        let (instance, rx) = instance(Arc::new(NoHooks), false);
        let driver = driver();
        instance.load(driver.clone(), Arc::new(mapper())).unwrap();
        assert_eq!(next_changed(&rx), vec!["hp", "mp", "gold", "title"]);

        driver.poke(Address::new(0x102), &[9]).unwrap();
        assert_eq!(next_changed(&rx), vec!["mp"]);

        instance.stop();
        assert!(wait_for(&rx, &Notification::SessionReset));
        assert_eq!(instance.state(), InstanceState::Idle);
        assert!(instance.properties().is_empty());
    }

    #[test]
    fn test_failed_read_resets_session() {
        let (instance, rx) = instance(Arc::new(NoHooks), false);
        let driver = driver();
        instance.load(driver.clone(), Arc::new(mapper())).unwrap();
        next_changed(&rx);

        driver.fail_next_reads(1);
        assert!(wait_for(&rx, &Notification::SessionReset));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(instance.state(), InstanceState::Faulted);
    }

    #[test]
    fn test_auto_reconnect_reloads() {
        let (instance, rx) = instance(Arc::new(NoHooks), true);
        let driver = driver();
        instance.load(driver.clone(), Arc::new(mapper())).unwrap();
        next_changed(&rx);

        driver.fail_next_reads(1);
        assert!(wait_for(&rx, &Notification::SessionReset));
        assert!(rx
            .recv_timeout(Duration::from_secs(5))
            .map(|n| matches!(n, Notification::MapperLoaded(_)))
            .unwrap_or(false));
        assert_eq!(next_changed(&rx), vec!["hp", "mp", "gold", "title"]);
    }

    #[test]
    fn test_load_failure_is_faulted() {
        let (instance, _rx) = instance(Arc::new(NoHooks), false);
        let mut definition = mapper();
        definition.properties[0].address = Some("0x100 +".to_string());
        assert!(matches!(
            instance.load(driver(), Arc::new(definition)),
            Err(InstanceError::Mapper(_))
        ));
        assert_eq!(instance.state(), InstanceState::Faulted);
    }

    #[test]
    fn test_preprocessor_false_short_circuits() {
        let mut hooks = FunctionHooks::new();
        hooks.register_predicate("gate", |ctx| Ok(Some(ctx.variable("ready") == Some(1))));
        let (instance, rx) = instance(Arc::new(hooks), false);

        let mut definition = mapper();
        definition.hooks.preprocessor = Some("gate".to_string());
        instance.load_once(driver(), Arc::new(definition)).unwrap();
        rx.try_recv().unwrap();

        instance.run_cycle().unwrap();
        assert!(rx.try_recv().is_err());
        assert!(instance.property("hp").unwrap().value.is_null());
    }

    #[test]
    fn test_postprocessor_changes_are_reconciled() {
        let mut hooks = FunctionHooks::new();
        hooks.register("post", |ctx| {
            ctx.set_property_value("title", PropertyValue::from("Renamed"))?;
            Ok(crate::scripting::HookOutcome::Handled)
        });
        let (instance, rx) = instance(Arc::new(hooks), false);

        let mut definition = mapper();
        definition.hooks.postprocessor = Some("post".to_string());
        instance.load_once(driver(), Arc::new(definition)).unwrap();
        rx.try_recv().unwrap();
        instance.run_cycle().unwrap();
        next_changed(&rx);

        // Second cycle: memory is unchanged, only the hook touches the title.
        instance.run_cycle().unwrap();
        assert_eq!(next_changed(&rx), vec!["title"]);
        assert_eq!(instance.property("title").unwrap().value, PropertyValue::from("Renamed"));
    }

    #[test]
    fn test_write_surface() {
        let (instance, rx) = instance(Arc::new(NoHooks), false);
        let driver = driver();
        instance.load_once(driver.clone(), Arc::new(mapper())).unwrap();
        instance.run_cycle().unwrap();
        next_changed(&rx);

        instance.set_value("hp", "0x63", false).unwrap();
        assert_eq!(driver.peek(Address::new(0x100), 2).unwrap(), vec![0x63, 0x00]);

        instance.set_bytes("mp", &[7], true).unwrap();
        assert!(instance.property("mp").unwrap().frozen);
        assert_eq!(next_changed(&rx), vec!["mp"]);

        instance.set_frozen("mp", false).unwrap();
        assert!(!instance.property("mp").unwrap().frozen);

        assert!(matches!(
            instance.set_value("missing", "1", false),
            Err(InstanceError::UnknownProperty(_))
        ));
        assert!(matches!(
            instance.set_bytes("hp", &[1, 2, 3], false),
            Err(InstanceError::Property(_))
        ));
    }

    #[test]
    fn test_logging_sink_never_fails() {
        let sink = LoggingSink;
        assert!(sink.on_session_reset().is_ok());
        assert!(sink.on_error("problem").is_ok());
    }
}
