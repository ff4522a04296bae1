//! Function variables range over the model's function pool of their arity.

use crate::error::BindingError;
use crate::interpret::BindingStack;
use crate::model::{FiniteModel, Function};
use crate::variable::FunctionVariable;

pub struct FunctionVariableInterpreter<'a> {
    model: &'a dyn FiniteModel,
    stack: BindingStack<FunctionVariable>,
}

impl<'a> FunctionVariableInterpreter<'a> {
    pub fn new(model: &'a dyn FiniteModel) -> Self {
        Self {
            model,
            stack: BindingStack::new(),
        }
    }

    pub fn bind(&mut self, variable: FunctionVariable) -> Result<(), BindingError> {
        self.stack.bind(variable, 0)
    }

    pub fn unbind(&mut self, variable: &FunctionVariable) -> Result<(), BindingError> {
        self.stack.unbind(variable)
    }

    pub fn lookup(&self, variable: &FunctionVariable) -> Option<Function> {
        self.stack
            .index_of(variable)
            .and_then(|index| self.model.function_candidate(variable.arity, index))
    }

    /// The function bound to `variable`, registering it as free if needed.
    pub fn value(&mut self, variable: &FunctionVariable) -> Result<Function, BindingError> {
        let index = self.stack.register(variable);
        self.model
            .function_candidate(variable.arity, index)
            .ok_or_else(|| BindingError::NoCandidates {
                variable: variable.to_string(),
            })
    }

    pub fn advance(&mut self, variable: &FunctionVariable) -> bool {
        let candidates = self.model.function_pool_size(variable.arity);
        self.stack.advance(variable, candidates)
    }

    pub fn next(&mut self) -> bool {
        let model = self.model;
        self.stack.next(|v| model.function_pool_size(v.arity))
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Variables read without a quantifier binding them.
    pub fn free_variables(&self) -> impl Iterator<Item = &FunctionVariable> {
        self.stack.free()
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.stack
            .iter()
            .map(|(variable, index, _)| {
                let value = self
                    .model
                    .function_candidate(variable.arity, index)
                    .map(|f| f.symbol().to_string())
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
    fn nullary_function_variables_range_over_entities() {
        let model = ModelKind::Four.build();
        let mut interpreter = FunctionVariableInterpreter::new(&model);
        let c = FunctionVariable::new("c", 0);
        let mut symbols = vec![interpreter.value(&c).unwrap().symbol().to_string()];
        while interpreter.next() {
            symbols.push(interpreter.lookup(&c).unwrap().symbol().to_string());
        }
        assert_eq!(symbols, ["0", "1", "2", "3"]);
    }

    #[test]
    fn empty_pool_is_reported() {
        let model = crate::model::Model::builder("bare")
            .entity("0", "only")
            .build()
            .unwrap();
        let mut interpreter = FunctionVariableInterpreter::new(&model);
        let err = interpreter.value(&FunctionVariable::new("f", 1)).unwrap_err();
        assert!(matches!(err, BindingError::NoCandidates { .. }));
    }
}
