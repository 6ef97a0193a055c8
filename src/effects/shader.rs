// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::bind_style::{BindStyle, Stage};
use crate::device::FeatureLevel;

/// A compiled shader for one stage, with its reflected bindings.
#[derive(Debug, Clone)]
pub struct ShaderDescription {
    pub(crate) name: String,
    pub(crate) stage: Stage,
    //may need additional type design for future backends
    pub(crate) bytecode: Vec<u8>,
    pub(crate) minimum_feature_level: FeatureLevel,
    pub(crate) bind_style: BindStyle,
}

impl ShaderDescription {
    pub fn new(name: &str, stage: Stage, bytecode: Vec<u8>, bind_style: BindStyle) -> Self {
        Self {
            name: name.to_string(),
            stage,
            bytecode,
            minimum_feature_level: FeatureLevel::Level9_1,
            bind_style,
        }
    }

    /// The shader is skipped on devices below `level`.
    pub fn with_minimum_feature_level(mut self, level: FeatureLevel) -> Self {
        self.minimum_feature_level = level;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn stage(&self) -> Stage {
        self.stage
    }
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }
    pub fn minimum_feature_level(&self) -> FeatureLevel {
        self.minimum_feature_level
    }
    pub fn bind_style(&self) -> &BindStyle {
        &self.bind_style
    }
}
