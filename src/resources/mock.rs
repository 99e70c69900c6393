//! Backend-free adapter families: `noop`, `mock_true`, `mock_false`.
//!
//! `noop` backs the synthetic start/end nodes emitted for groups.  The mock
//! families answer every capability with a fixed verdict and are useful for
//! dry composition of DSL files.
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::registry::{AdapterFamily, OperatorFactory};
use super::{Operator, Outcome, typed_params};

const DEFAULT_SUBTYPE: &[&str] = &["default"];

/// Optional knobs accepted by every mock operator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockParams {
    /// Message attached to every outcome instead of the built-in one.
    #[serde(default)]
    pub message: Option<String>,
}

/// Operator whose every capability trivially succeeds without a message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOperator;

impl Operator for NoopOperator {
    fn description(&self) -> String {
        "noop".to_string()
    }

    fn create(&self) -> Result<Outcome> {
        Ok(Outcome::success())
    }

    fn delete(&self) -> Result<Outcome> {
        Ok(Outcome::success())
    }

    fn exists(&self) -> Result<Outcome> {
        Ok(Outcome::success())
    }

    fn absent(&self) -> Result<Outcome> {
        Ok(Outcome::success())
    }
}

/// Operator answering every capability with the same verdict.
#[derive(Debug, Clone)]
pub struct FixedOperator {
    verdict: bool,
    message: Option<String>,
}

impl FixedOperator {
    /// Operator that always succeeds.
    #[must_use]
    pub const fn always_true(message: Option<String>) -> Self {
        Self {
            verdict: true,
            message,
        }
    }

    /// Operator that always fails.
    #[must_use]
    pub const fn always_false(message: Option<String>) -> Self {
        Self {
            verdict: false,
            message,
        }
    }

    fn answer(&self, action: &str) -> Outcome {
        let message = self.message.clone().unwrap_or_else(|| {
            if self.verdict {
                format!("resource {action} (always true)")
            } else {
                format!("resource not {action} (always false)")
            }
        });
        Outcome {
            ok: self.verdict,
            message,
        }
    }
}

impl Operator for FixedOperator {
    fn description(&self) -> String {
        if self.verdict { "mock_true" } else { "mock_false" }.to_string()
    }

    fn create(&self) -> Result<Outcome> {
        Ok(self.answer("created"))
    }

    fn delete(&self) -> Result<Outcome> {
        Ok(self.answer("deleted"))
    }

    fn exists(&self) -> Result<Outcome> {
        Ok(self.answer("exists"))
    }

    fn absent(&self) -> Result<Outcome> {
        Ok(self.answer("absent"))
    }
}

fn build_noop(
    _connector: &Map<String, Value>,
    _params: &Map<String, Value>,
) -> serde_json::Result<Box<dyn Operator>> {
    Ok(Box::new(NoopOperator))
}

fn build_true(
    _connector: &Map<String, Value>,
    params: &Map<String, Value>,
) -> serde_json::Result<Box<dyn Operator>> {
    let params: MockParams = typed_params(params)?;
    Ok(Box::new(FixedOperator::always_true(params.message)))
}

fn build_false(
    _connector: &Map<String, Value>,
    params: &Map<String, Value>,
) -> serde_json::Result<Box<dyn Operator>> {
    let params: MockParams = typed_params(params)?;
    Ok(Box::new(FixedOperator::always_false(params.message)))
}

macro_rules! single_subtype_family {
    ($family:ident, $name:literal, $factory:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $family;

        impl AdapterFamily for $family {
            fn name(&self) -> &'static str {
                $name
            }

            fn subtypes(&self) -> &'static [&'static str] {
                DEFAULT_SUBTYPE
            }

            fn get_operator(&self, subtype: &str) -> Option<OperatorFactory> {
                (subtype == "default").then_some($factory as OperatorFactory)
            }
        }
    };
}

single_subtype_family!(
    NoopFamily,
    "noop",
    build_noop,
    "Family of the synthetic group boundary nodes."
);
single_subtype_family!(
    MockTrueFamily,
    "mock_true",
    build_true,
    "Family whose operators always succeed."
);
single_subtype_family!(
    MockFalseFamily,
    "mock_false",
    build_false,
    "Family whose operators always fail."
);

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::{Capability, invoke};
    use serde_json::json;

    const ALL: [Capability; 4] = [
        Capability::Create,
        Capability::Delete,
        Capability::Exists,
        Capability::Absent,
    ];

    #[test]
    fn noop_always_succeeds_silently() {
        for cap in ALL {
            assert_eq!(invoke(&NoopOperator, cap).unwrap(), Outcome::success());
        }
    }

    #[test]
    fn fixed_verdicts() {
        let yes = FixedOperator::always_true(None);
        let no = FixedOperator::always_false(None);
        for cap in ALL {
            assert!(invoke(&yes, cap).unwrap().ok);
            assert!(!invoke(&no, cap).unwrap().ok);
        }
        assert_eq!(no.exists().unwrap().message, "resource not exists (always false)");
    }

    #[test]
    fn custom_message_is_used() {
        let Value::Object(params) = json!({"message": "hello"}) else {
            return;
        };
        let op = build_true(&Map::new(), &params).unwrap();
        assert_eq!(op.delete().unwrap().message, "hello");
    }

    #[test]
    fn families_only_offer_default_subtype() {
        assert!(MockTrueFamily.get_operator("default").is_some());
        assert!(MockTrueFamily.get_operator("file").is_none());
        assert_eq!(NoopFamily.subtypes(), &["default"]);
        assert_eq!(MockFalseFamily.name(), "mock_false");
    }

    #[test]
    fn unknown_mock_param_is_rejected() {
        let Value::Object(params) = json!({"colour": "red"}) else {
            return;
        };
        assert!(build_false(&Map::new(), &params).is_err());
    }
}
