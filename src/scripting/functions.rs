// Thu Feb 19 2026 - Alex

use crate::property::PropertyValue;
use crate::scripting::{HookContext, HookError, HookOutcome, HookProvider};
use std::collections::HashMap;

type HookFn = Box<dyn Fn(&mut HookContext<'_>) -> Result<HookOutcome, HookError> + Send + Sync>;
type PredicateFn = Box<dyn Fn(&mut HookContext<'_>) -> Result<Option<bool>, HookError> + Send + Sync>;

/// Hook provider backed by native closures registered by name. Embedders wire
/// their script runtime in by registering thin adapters here.
#[derive(Default)]
pub struct FunctionHooks {
    functions: HashMap<String, HookFn>,
    predicates: HashMap<String, PredicateFn>,
}

impl FunctionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut HookContext<'_>) -> Result<HookOutcome, HookError> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(func));
    }

    pub fn register_predicate<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut HookContext<'_>) -> Result<Option<bool>, HookError> + Send + Sync + 'static,
    {
        self.predicates.insert(name.to_string(), Box::new(func));
    }
}

impl HookProvider for FunctionHooks {
    fn try_call(&self, hook: &str, ctx: &mut HookContext<'_>) -> Result<HookOutcome, HookError> {
        match self.functions.get(hook) {
            Some(func) => func(ctx),
            None => Ok(HookOutcome::NotHandled),
        }
    }

    fn call_boolean(&self, hook: &str, ctx: &mut HookContext<'_>) -> Result<Option<bool>, HookError> {
        if let Some(predicate) = self.predicates.get(hook) {
            return predicate(ctx);
        }
        match self.functions.get(hook) {
            Some(func) => Ok(match func(ctx)? {
                HookOutcome::Value(PropertyValue::Boolean(b)) => Some(b),
                _ => None,
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::property::PropertyRegistry;
    use crate::resolver::Variables;
    use crate::memory::{Address, DEFAULT_NAMESPACE};
    use crate::scripting::{ByteTransform, TransformRegistry};
    use std::sync::Arc;

    #[test]
    fn test_registered_hooks_are_called() {
        let mut hooks = FunctionHooks::new();
        hooks.register("setBase", |ctx| {
            ctx.set_variable("base", Some(0x2000));
            Ok(HookOutcome::Handled)
        });
        hooks.register("isReady", |_| Ok(HookOutcome::Value(PropertyValue::Boolean(false))));

        let mut registry = PropertyRegistry::new();
        let mut memory = MemoryStore::new();
        let mut variables = Variables::new();
        let transforms = TransformRegistry::new();
        let mut ctx = HookContext::for_cycle(&mut registry, &mut memory, &mut variables, &transforms);

        assert_eq!(hooks.try_call("setBase", &mut ctx).unwrap(), HookOutcome::Handled);
        assert_eq!(hooks.try_call("missing", &mut ctx).unwrap(), HookOutcome::NotHandled);
        assert_eq!(hooks.call_boolean("isReady", &mut ctx).unwrap(), Some(false));
        assert_eq!(hooks.call_boolean("missing", &mut ctx).unwrap(), None);
        assert_eq!(ctx.variable("base"), Some(0x2000));
    }

    struct Invert;

    impl ByteTransform for Invert {
        fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, String> {
            Ok(bytes.iter().map(|b| !b).collect())
        }

        fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>, String> {
            self.decode(bytes)
        }
    }

    #[test]
    fn test_hook_decodes_record_through_transform() {
        let mut hooks = FunctionHooks::new();
        hooks.register("unpackRecord", |ctx| {
            let raw = ctx
                .memory()
                .read(DEFAULT_NAMESPACE, Address::new(0x10), 2)
                .map_err(|e| HookError::Failed(e.to_string()))?;
            let plain = ctx.decode_bytes("invert", &raw)?;
            ctx.memory_mut()
                .fill("record", Address::new(0), &plain)
                .map_err(|e| HookError::Failed(e.to_string()))?;
            let packed = ctx.encode_bytes("invert", &plain)?;
            Ok(HookOutcome::Value(PropertyValue::Integer(packed[0] as i64)))
        });

        let mut registry = PropertyRegistry::new();
        let mut memory = MemoryStore::new();
        memory.fill(DEFAULT_NAMESPACE, Address::new(0x10), &[0xFE, 0x0F]).unwrap();
        let mut variables = Variables::new();
        let mut transforms = TransformRegistry::new();
        transforms.register("invert", Arc::new(Invert));
        let mut ctx = HookContext::for_cycle(&mut registry, &mut memory, &mut variables, &transforms);

        let outcome = hooks.try_call("unpackRecord", &mut ctx).unwrap();
        assert_eq!(outcome, HookOutcome::Value(PropertyValue::Integer(0xFE)));
        assert_eq!(memory.read("record", Address::new(0), 2).unwrap(), vec![0x01, 0xF0]);
    }
}
