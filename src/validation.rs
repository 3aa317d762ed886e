//! Document Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy (the configured failure mode) decides whether they block.

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, FailureMode};
use crate::layer::{Document, LayerKind, Parent};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }
}

/// Validation rule trait - produces violations
pub trait DocumentRule {
    fn name(&self) -> &'static str;
    fn validate(&self, doc: &Document, config: &EngineConfig) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct CanvasSizeRule;

impl DocumentRule for CanvasSizeRule {
    fn name(&self) -> &'static str { "canvas_size" }

    fn validate(&self, doc: &Document, config: &EngineConfig) -> Vec<ValidationViolation> {
        let actual = format!("{}x{}", doc.width, doc.height);

        if doc.width == 0 || doc.height == 0 {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Canvas has zero area".to_string(),
                expected: Some("non-zero width and height".to_string()),
                actual: Some(actual),
                remediation: vec!["Re-export the document with a valid canvas".to_string()],
            }];
        }

        let rule = &config.canvas;
        let pixels = u64::from(doc.width) * u64::from(doc.height);
        if pixels > rule.pixel_limit() {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Canvas too large".to_string(),
                expected: Some(format!("at most {} pixels", rule.pixel_limit())),
                actual: Some(format!("{} ({} pixels)", actual, pixels)),
                remediation: vec!["Reduce the canvas size".to_string()],
            }];
        }

        if !rule.enabled || rule.allowed_sizes.contains(&[doc.width, doc.height]) {
            return vec![];
        }

        let expected: Vec<_> = rule.allowed_sizes.iter()
            .map(|[w, h]| format!("{}x{}", w, h))
            .collect();
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "Canvas size not allowed".to_string(),
            expected: Some(expected.join(" or ")),
            actual: Some(actual),
            remediation: vec!["Resize the canvas to one of the allowed sizes".to_string()],
        }]
    }
}

pub struct ColorModeRule;

impl DocumentRule for ColorModeRule {
    fn name(&self) -> &'static str { "color_mode" }

    fn validate(&self, doc: &Document, config: &EngineConfig) -> Vec<ValidationViolation> {
        let rule = &config.color_modes;
        if !rule.enabled || rule.allowed.contains(&doc.color_mode) {
            return vec![];
        }

        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "Unsupported color mode".to_string(),
            expected: Some(format!("{:?}", rule.allowed)),
            actual: Some(format!("{:?}", doc.color_mode)),
            remediation: vec!["Convert the document to an allowed color mode".to_string()],
        }]
    }
}

/// Parent links and group child lists must agree.
pub struct HierarchyRule;

impl HierarchyRule {
    fn violation(&self, message: String) -> ValidationViolation {
        ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message,
            expected: None,
            actual: None,
            remediation: vec!["Re-export the document; its layer tree is inconsistent".to_string()],
        }
    }
}

impl DocumentRule for HierarchyRule {
    fn name(&self) -> &'static str { "hierarchy" }

    fn validate(&self, doc: &Document, _config: &EngineConfig) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for layer in &doc.layers {
            if let Parent::Layer(pid) = layer.parent {
                match doc.layer(pid) {
                    None => violations.push(self.violation(format!(
                        "Layer {} (\"{}\") has missing parent {}", layer.id, layer.name, pid
                    ))),
                    Some(parent) if parent.kind != LayerKind::Group => violations.push(self.violation(format!(
                        "Layer {} (\"{}\") has non-group parent {}", layer.id, layer.name, pid
                    ))),
                    Some(_) => {}
                }
            }

            for &child in &layer.children {
                let claims_parent = doc.layer(child)
                    .is_some_and(|c| c.parent == Parent::Layer(layer.id));
                if !claims_parent {
                    violations.push(self.violation(format!(
                        "Group {} lists child {} which does not point back to it", layer.id, child
                    )));
                }
            }
        }

        violations
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn DocumentRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(CanvasSizeRule),
                Box::new(ColorModeRule),
                Box::new(HierarchyRule),
            ],
        }
    }

    pub fn validate(&self, doc: &Document, config: &EngineConfig) -> ValidationResult {
        let violations: Vec<_> = self.rules.iter()
            .flat_map(|rule| rule.validate(doc, config))
            .collect();

        let has_errors = violations.iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        match config.failure_mode {
            FailureMode::Block => ValidationResult { valid: !has_errors, violations },
            FailureMode::Warn => {
                for v in &violations {
                    tracing::warn!(rule = %v.rule, "{}", v.message);
                }
                ValidationResult { valid: true, violations }
            }
            FailureMode::Log => {
                for v in &violations {
                    tracing::info!(rule = %v.rule, "{}", v.message);
                }
                ValidationResult { valid: true, violations }
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{ColorMode, Layer, Rect};

    fn raster(id: u32) -> Layer {
        Layer::new(id, format!("layer {}", id), LayerKind::Raster, Rect::new(0, 0, 4, 4))
    }

    #[test]
    fn test_valid_document() {
        let doc = Document::new(4, 4, vec![raster(1)]);
        let result = Validator::new().validate(&doc, &EngineConfig::default());
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_zero_canvas_blocks() {
        let doc = Document::new(0, 4, vec![]);
        let result = Validator::new().validate(&doc, &EngineConfig::default());
        assert!(!result.valid);
        assert_eq!(result.violations[0].rule, "canvas_size");
    }

    #[test]
    fn test_canvas_size_gate() {
        let mut config = EngineConfig::default();
        config.canvas.enabled = true;
        config.canvas.allowed_sizes = vec![[1170, 363], [570, 363]];

        let ok = Document::new(570, 363, vec![]);
        assert!(Validator::new().validate(&ok, &config).valid);

        let bad = Document::new(1170, 364, vec![]);
        let result = Validator::new().validate(&bad, &config);
        assert!(!result.valid);
        assert_eq!(result.violations[0].expected.as_deref(), Some("1170x363 or 570x363"));
    }

    #[test]
    fn test_canvas_pixel_limit_always_applies() {
        let huge = Document::new(u32::MAX, u32::MAX, vec![]);
        let result = Validator::new().validate(&huge, &EngineConfig::default());
        assert!(!result.valid);
        assert_eq!(result.violations[0].message, "Canvas too large");

        let mut config = EngineConfig::default();
        config.canvas.max_pixels = 100;
        assert!(Validator::new().validate(&Document::new(10, 10, vec![]), &config).valid);
        assert!(!Validator::new().validate(&Document::new(10, 11, vec![]), &config).valid);
    }

    #[test]
    fn test_color_mode_rule() {
        let mut doc = Document::new(4, 4, vec![]);
        doc.color_mode = ColorMode::Cmyk;
        let result = Validator::new().validate(&doc, &EngineConfig::default());
        assert!(!result.valid);
        assert_eq!(result.violations[0].rule, "color_mode");
    }

    #[test]
    fn test_hierarchy_non_group_parent() {
        let mut child = raster(2);
        child.parent = Parent::Layer(1);
        let doc = Document::new(4, 4, vec![raster(1), child]);
        let result = Validator::new().validate(&doc, &EngineConfig::default());
        assert!(result.violations.iter().any(|v| v.rule == "hierarchy"));
    }

    #[test]
    fn test_hierarchy_child_mismatch() {
        let mut group = Layer::new(1, "g", LayerKind::Group, Rect::default());
        group.children = vec![2];
        let doc = Document::new(4, 4, vec![raster(2), group]);
        let result = Validator::new().validate(&doc, &EngineConfig::default());
        assert!(!result.valid);
    }

    #[test]
    fn test_warn_mode_never_blocks() {
        let mut config = EngineConfig::default();
        config.failure_mode = FailureMode::Warn;
        let doc = Document::new(0, 0, vec![]);
        let result = Validator::new().validate(&doc, &config);
        assert!(result.valid);
        assert!(result.has_errors());
    }
}
