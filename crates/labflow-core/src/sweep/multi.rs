//! Several variables swept together.
//!
//! Axes advance in lockstep. When they differ in length, the shorter ones
//! hold their last value until the longest is exhausted.

use indexmap::IndexMap;

use super::spec::{is_identifier, LoopSpec, LoopSpecError, SweepLimits};

/// The values of one variable in a multi sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepAxis {
    pub variable: String,
    pub values: Vec<f64>,
}

impl SweepAxis {
    pub fn from_range(spec: &LoopSpec) -> Result<Self, LoopSpecError> {
        Ok(Self {
            variable: spec.variable.clone(),
            values: spec.values()?.collect(),
        })
    }

    pub fn list(variable: impl Into<String>, values: Vec<f64>) -> Result<Self, LoopSpecError> {
        let variable = variable.into();
        if !is_identifier(&variable) {
            return Err(LoopSpecError::InvalidVariable(variable));
        }
        if values.is_empty() {
            return Err(LoopSpecError::InvalidAxis {
                spec: variable,
                reason: "no values".into(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(LoopSpecError::NonFinite { field: "value" });
        }
        Ok(Self { variable, values })
    }

    /// Parse `name=start:end:step` or `name=v1,v2,...`.
    pub fn parse(assignment: &str, limits: SweepLimits) -> Result<Self, LoopSpecError> {
        let invalid = |reason: &str| LoopSpecError::InvalidAxis {
            spec: assignment.to_string(),
            reason: reason.to_string(),
        };
        let (variable, spec) = assignment
            .split_once('=')
            .ok_or_else(|| invalid("expected NAME=START:END:STEP or NAME=V1,V2,..."))?;
        let variable = variable.trim();

        let number = |text: &str| {
            text.trim()
                .parse::<f64>()
                .map_err(|_| invalid(&format!("'{}' is not a number", text.trim())))
        };

        if spec.contains(':') {
            let parts: Vec<&str> = spec.split(':').collect();
            let [start, end, step] = parts.as_slice() else {
                return Err(invalid("a range needs exactly START:END:STEP"));
            };
            let range = LoopSpec::new(variable, number(*start)?, number(*end)?, number(*step)?)
                .with_limits(limits);
            Self::from_range(&range)
        } else {
            let values = spec
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(number)
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() > limits.max_iterations {
                return Err(LoopSpecError::TooManyIterations {
                    variable: variable.to_string(),
                    count: values.len() as f64,
                    limit: limits.max_iterations,
                });
            }
            Self::list(variable, values)
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for iteration `index`, repeating the last one past the end.
    pub fn value_at(&self, index: usize) -> f64 {
        let last = self.values.len().saturating_sub(1);
        self.values[index.min(last)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiSweep {
    axes: Vec<SweepAxis>,
}

impl MultiSweep {
    pub fn new(axes: Vec<SweepAxis>) -> Result<Self, LoopSpecError> {
        if axes.is_empty() {
            return Err(LoopSpecError::NoAxes);
        }
        for (i, axis) in axes.iter().enumerate() {
            if axis.is_empty() {
                return Err(LoopSpecError::InvalidAxis {
                    spec: axis.variable.clone(),
                    reason: "no values".into(),
                });
            }
            if axes[..i].iter().any(|a| a.variable == axis.variable) {
                return Err(LoopSpecError::DuplicateVariable(axis.variable.clone()));
            }
        }
        Ok(Self { axes })
    }

    pub fn single(spec: &LoopSpec) -> Result<Self, LoopSpecError> {
        Self::new(vec![SweepAxis::from_range(spec)?])
    }

    pub fn axes(&self) -> &[SweepAxis] {
        &self.axes
    }

    /// Number of iterations: the longest axis.
    pub fn len(&self) -> usize {
        self.axes.iter().map(SweepAxis::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_mismatched_lengths(&self) -> bool {
        let len = self.len();
        self.axes.iter().any(|a| a.len() != len)
    }

    /// Variable assignments for iteration `index`.
    pub fn assignments(&self, index: usize) -> IndexMap<String, f64> {
        self.axes
            .iter()
            .map(|axis| (axis.variable.clone(), axis.value_at(index)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexMap<String, f64>> + '_ {
        (0..self.len()).map(|i| self.assignments(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_and_list() {
        let range = SweepAxis::parse("field=0:0.2:0.1", SweepLimits::default()).unwrap();
        assert_eq!(range.variable, "field");
        assert_eq!(range.values, vec![0.0, 0.1, 0.2]);

        let list = SweepAxis::parse("power=40, 70", SweepLimits::default()).unwrap();
        assert_eq!(list.values, vec![40.0, 70.0]);
    }

    #[test]
    fn test_parse_errors() {
        let limits = SweepLimits::default();
        for bad in ["field", "field=0:1", "field=a,b", "field=", "=1,2"] {
            assert!(SweepAxis::parse(bad, limits).is_err(), "{bad} should fail");
        }
        assert!(matches!(
            SweepAxis::parse("field=0:1:-0.1", limits),
            Err(LoopSpecError::WrongDirection { .. })
        ));
    }

    #[test]
    fn test_short_axis_repeats_last_value() {
        let sweep = MultiSweep::new(vec![
            SweepAxis::list("field", vec![0.0, 0.1, 0.2]).unwrap(),
            SweepAxis::list("power", vec![40.0, 70.0]).unwrap(),
        ])
        .unwrap();

        assert_eq!(sweep.len(), 3);
        assert!(sweep.has_mismatched_lengths());
        let powers: Vec<f64> = sweep.iter().map(|a| a["power"]).collect();
        assert_eq!(powers, vec![40.0, 70.0, 70.0]);
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let axis = SweepAxis::list("field", vec![1.0]).unwrap();
        assert_eq!(
            MultiSweep::new(vec![axis.clone(), axis]),
            Err(LoopSpecError::DuplicateVariable("field".into()))
        );
        assert_eq!(MultiSweep::new(Vec::new()), Err(LoopSpecError::NoAxes));
    }
}
