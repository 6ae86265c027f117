//! `<for>`: numeric range and collection iteration.
//!
//! A numeric range starts at `from` (default 0) and steps by `by` (default 1,
//! must be positive) towards `to` (default 0), which is exclusive. The range is
//! floating point when any bound evaluates to a float. One scope is opened for
//! the whole loop, so the loop variable is rebound in place on each pass.

use crate::error::TemplateError;
use crate::executor::TemplateExecutor;
use xtemplate_dom::NodeRef;
use xtemplate_expr::Value;
use xtemplate_writer::OutputSink;

const ILLEGAL_COMBINATION: &str = "<for> has illegal combination of attributes";

fn invalid_bound(element: &NodeRef, attribute: &str) -> TemplateError {
    TemplateError::config(element, format!("<for> {} value invalid", attribute))
        .with_attribute(attribute)
}

fn int_bound(
    element: &NodeRef,
    attribute: &str,
    value: Option<&Value>,
    default: i64,
) -> Result<i64, TemplateError> {
    value.map_or(Ok(default), |v| {
        v.as_int().map_err(|_| invalid_bound(element, attribute))
    })
}

fn float_bound(
    element: &NodeRef,
    attribute: &str,
    value: Option<&Value>,
    default: f64,
) -> Result<f64, TemplateError> {
    value.map_or(Ok(default), |v| {
        v.as_double().map_err(|_| invalid_bound(element, attribute))
    })
}

impl TemplateExecutor {
    pub(crate) fn handle_for(
        &mut self,
        element: &NodeRef,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let name = self.identifier_attribute(element, "name", "Illegal name in <for>")?;
        let collection = self.substituted_attribute(element, "collection")?;
        let from = self.substituted_attribute(element, "from")?;
        let to = self.substituted_attribute(element, "to")?;
        let by = self.substituted_attribute(element, "by")?;
        let index = self.identifier_attribute(element, "index", "Illegal index in <for>")?;
        let numeric = from.is_some() || to.is_some() || by.is_some();

        match collection {
            Some(_) if numeric => Err(TemplateError::config(element, ILLEGAL_COMBINATION)),
            Some(collection) => self.for_collection(
                element,
                name.as_deref(),
                index.as_deref(),
                &collection,
                sink,
            ),
            None if numeric => {
                if index.is_some() {
                    return Err(TemplateError::config(element, ILLEGAL_COMBINATION));
                }
                let from = from
                    .map(|t| self.evaluate(element, "from", &t))
                    .transpose()?;
                let to = to.map(|t| self.evaluate(element, "to", &t)).transpose()?;
                let by = by.map(|t| self.evaluate(element, "by", &t)).transpose()?;
                let floating = [&from, &to, &by]
                    .iter()
                    .any(|v| matches!(v, Some(v) if v.is_floating()));
                if floating {
                    self.for_float_range(
                        element,
                        name.as_deref(),
                        [from.as_ref(), to.as_ref(), by.as_ref()],
                        sink,
                    )
                } else {
                    self.for_int_range(
                        element,
                        name.as_deref(),
                        [from.as_ref(), to.as_ref(), by.as_ref()],
                        sink,
                    )
                }
            }
            None => Err(TemplateError::config(
                element,
                "<for> must specify iteration type",
            )),
        }
    }

    fn for_int_range(
        &mut self,
        element: &NodeRef,
        name: Option<&str>,
        [from, to, by]: [Option<&Value>; 3],
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let from = int_bound(element, "from", from, 0)?;
        let to = int_bound(element, "to", to, 0)?;
        let by = int_bound(element, "by", by, 1)?;
        if by <= 0 {
            return Err(invalid_bound(element, "by"));
        }
        self.run_range(element, name, from, to, sink, |value, ascending| {
            if ascending {
                value.checked_add(by)
            } else {
                value.checked_sub(by)
            }
        })
    }

    fn for_float_range(
        &mut self,
        element: &NodeRef,
        name: Option<&str>,
        [from, to, by]: [Option<&Value>; 3],
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let from = float_bound(element, "from", from, 0.0)?;
        let to = float_bound(element, "to", to, 0.0)?;
        let by = float_bound(element, "by", by, 1.0)?;
        if by.is_nan() || by <= 0.0 {
            return Err(invalid_bound(element, "by"));
        }
        self.run_range(element, name, from, to, sink, |value, ascending| {
            Some(if ascending { value + by } else { value - by })
        })
    }

    /// Runs the body from `from` towards the exclusive bound `to`. `step`
    /// returns `None` when the next value is not representable.
    fn run_range<T>(
        &mut self,
        element: &NodeRef,
        name: Option<&str>,
        from: T,
        to: T,
        sink: &mut dyn OutputSink,
        step: impl Fn(T, bool) -> Option<T>,
    ) -> Result<(), TemplateError>
    where
        T: Copy + PartialOrd + Into<Value>,
    {
        if from == to {
            return Ok(());
        }
        let ascending = from < to;
        let mut scope = self.enter_scope(element);
        let mut current = from;
        loop {
            if let Some(name) = name {
                scope.bind_variable(element, name, current.into())?;
            }
            scope.process_contents(element, true, sink)?;
            match step(current, ascending) {
                Some(next) if (ascending && next < to) || (!ascending && next > to) => {
                    current = next
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Iterates the values of a mapping, or the items of a sequence, in order.
    fn for_collection(
        &mut self,
        element: &NodeRef,
        name: Option<&str>,
        index: Option<&str>,
        collection: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<(), TemplateError> {
        let value = self.evaluate(element, "collection", collection)?;
        let Some(items) = value.iterate() else {
            return Err(TemplateError::type_error(
                element,
                format!(
                    "<for> collection must be capable of iteration - {}",
                    value.type_name()
                ),
            )
            .with_attribute("collection"));
        };
        let mut scope = self.enter_scope(element);
        for (i, item) in items.into_iter().enumerate() {
            if let Some(name) = name {
                scope.bind_variable(element, name, item)?;
            }
            if let Some(index) = index {
                scope.bind_variable(element, index, Value::Int(i as i64))?;
            }
            scope.process_contents(element, true, sink)?;
        }
        Ok(())
    }
}
