//! Host capability checks
//!
//! The host reports what its environment supports; `init` refuses to start
//! without the required ones and degrades gracefully for the rest.

use std::collections::HashSet;

/// Host environment features the viewer can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A drawing surface
    Canvas,
    /// Running the parser off the control thread
    BackgroundWorker,
    /// Vector graphics for overlays
    VectorGraphics,
    /// GPU-accelerated line drawing
    GpuAcceleration,
    /// Dropping files onto the viewer
    DragAndDrop,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Self::Canvas,
        Self::BackgroundWorker,
        Self::VectorGraphics,
        Self::GpuAcceleration,
        Self::DragAndDrop,
    ];

    /// Required capabilities abort startup when missing
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::Canvas | Self::BackgroundWorker | Self::VectorGraphics
        )
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canvas => write!(f, "Canvas"),
            Self::BackgroundWorker => write!(f, "Background Worker"),
            Self::VectorGraphics => write!(f, "Vector Graphics"),
            Self::GpuAcceleration => write!(f, "GPU Acceleration"),
            Self::DragAndDrop => write!(f, "Drag and Drop"),
        }
    }
}

/// Set of capabilities the host supports
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    supported: HashSet<Capability>,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            supported: Capability::ALL.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.supported.insert(capability);
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.supported.remove(&capability);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }

    /// Required capabilities not supported, in declaration order
    pub fn missing_required(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| c.is_required() && !self.has(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_has_nothing_missing() {
        assert!(Capabilities::all().missing_required().is_empty());
    }

    #[test]
    fn test_missing_required_in_order() {
        let caps = Capabilities::none().with(Capability::BackgroundWorker);
        assert_eq!(
            caps.missing_required(),
            vec![Capability::Canvas, Capability::VectorGraphics]
        );
    }

    #[test]
    fn test_optional_capabilities_are_not_required() {
        let caps = Capabilities::all()
            .without(Capability::GpuAcceleration)
            .without(Capability::DragAndDrop);
        assert!(caps.missing_required().is_empty());
        assert!(!caps.has(Capability::GpuAcceleration));
    }
}
