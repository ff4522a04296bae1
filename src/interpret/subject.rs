//! Subject variables range over the model's entities.

use crate::error::BindingError;
use crate::interpret::BindingStack;
use crate::model::{Entity, FiniteModel};
use crate::variable::SubjectVariable;

pub struct SubjectVariableInterpreter<'a> {
    model: &'a dyn FiniteModel,
    stack: BindingStack<SubjectVariable>,
}

impl<'a> SubjectVariableInterpreter<'a> {
    pub fn new(model: &'a dyn FiniteModel) -> Self {
        Self {
            model,
            stack: BindingStack::new(),
        }
    }

    /// Bind `variable` to the first entity.
    pub fn bind(&mut self, variable: SubjectVariable) -> Result<(), BindingError> {
        self.stack.bind(variable, 0)
    }

    /// Bind `variable` to a specific entity.
    pub fn bind_to(&mut self, variable: SubjectVariable, entity: Entity) -> Result<(), BindingError> {
        let size = self.model.entity_count();
        if entity.index() >= size {
            return Err(BindingError::OutOfRange {
                index: entity.index(),
                size,
            });
        }
        self.stack.bind(variable, entity.index())
    }

    pub fn unbind(&mut self, variable: &SubjectVariable) -> Result<(), BindingError> {
        self.stack.unbind(variable)
    }

    /// The entity bound to `variable`, if it is on the stack.
    pub fn lookup(&self, variable: &SubjectVariable) -> Option<Entity> {
        self.stack
            .index_of(variable)
            .and_then(|index| self.model.entity(index))
    }

    /// The entity bound to `variable`, registering it as free if needed.
    pub fn value(&mut self, variable: &SubjectVariable) -> Result<Entity, BindingError> {
        let index = self.stack.register(variable);
        let size = self.model.entity_count();
        self.model
            .entity(index)
            .ok_or(BindingError::OutOfRange { index, size })
    }

    /// Move `variable` to the next entity; `false` if it is on the last one.
    pub fn advance(&mut self, variable: &SubjectVariable) -> bool {
        self.stack.advance(variable, self.model.entity_count())
    }

    pub fn next(&mut self) -> bool {
        let count = self.model.entity_count();
        self.stack.next(|_| count)
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Variables read without a quantifier binding them.
    pub fn free_variables(&self) -> impl Iterator<Item = &SubjectVariable> {
        self.stack.free()
    }

    /// Current bindings as `(variable, entity name)`, outermost first.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.stack
            .iter()
            .map(|(variable, index, _)| {
                let value = self
                    .model
                    .entity(index)
                    .map(|e| self.model.entity_name(e))
                    .unwrap_or_else(|| format!("#{index}"));
                (variable.to_string(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    #[test]
    fn bound_variables_enumerate_entity_count_to_the_power() {
        let model = ModelKind::Three.build();
        let mut interpreter = SubjectVariableInterpreter::new(&model);
        for name in ["x", "y", "z"] {
            interpreter.bind(SubjectVariable::new(name)).unwrap();
        }
        let mut valuations = 1;
        while interpreter.next() {
            valuations += 1;
        }
        assert_eq!(valuations, model.entity_count().pow(3));
    }

    #[test]
    fn free_variables_start_at_first_entity() {
        let model = ModelKind::Four.build();
        let mut interpreter = SubjectVariableInterpreter::new(&model);
        let x = SubjectVariable::new("x");
        assert_eq!(interpreter.lookup(&x), None);
        assert_eq!(interpreter.value(&x).unwrap(), Entity::new(0));
        assert!(interpreter.next());
        assert_eq!(interpreter.lookup(&x), Some(Entity::new(1)));
    }

    #[test]
    fn bind_to_rejects_foreign_entities() {
        let model = ModelKind::Unary.build();
        let mut interpreter = SubjectVariableInterpreter::new(&model);
        let err = interpreter
            .bind_to(SubjectVariable::new("x"), Entity::new(3))
            .unwrap_err();
        assert!(matches!(err, BindingError::OutOfRange { index: 3, size: 1 }));
    }

    #[test]
    fn snapshot_uses_entity_names() {
        let model = ModelKind::Three.build();
        let mut interpreter = SubjectVariableInterpreter::new(&model);
        interpreter
            .bind_to(SubjectVariable::new("x"), Entity::new(2))
            .unwrap();
        assert_eq!(interpreter.snapshot(), vec![("x".to_string(), "2".to_string())]);
        interpreter.clear();
        assert!(interpreter.is_empty());
    }
}
