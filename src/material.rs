//! Material kinds and the units that machines move around.

use std::fmt;

use bytes::Bytes;

/// Closed set of material kinds known to the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialKind {
    MetalPipe,
    Gravel,
    TitaniumSlab,
    MetalPipeHalf,
    Invalid,
}

/// Kinds the source station can manufacture, in round-robin order.
pub const GENERATABLE_KINDS: [MaterialKind; 3] = [
    MaterialKind::MetalPipe,
    MaterialKind::Gravel,
    MaterialKind::TitaniumSlab,
];

impl MaterialKind {
    /// Payload size of a freshly manufactured unit, or `None` when the kind
    /// can only come out of processing (or is not a real material).
    pub fn recipe_size(self) -> Option<usize> {
        match self {
            MaterialKind::MetalPipe => Some(1024),
            MaterialKind::Gravel => Some(4096),
            MaterialKind::TitaniumSlab => Some(2048),
            MaterialKind::MetalPipeHalf | MaterialKind::Invalid => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::MetalPipe => "MetalPipe",
            MaterialKind::Gravel => "Gravel",
            MaterialKind::TitaniumSlab => "TitaniumSlab",
            MaterialKind::MetalPipeHalf => "MetalPipeHalf",
            MaterialKind::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of material. The payload is opaque to every machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Material {
    kind: MaterialKind,
    payload: Bytes,
}

impl Material {
    pub fn new(kind: MaterialKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Manufacture a raw unit from its recipe; `None` for derived kinds.
    pub fn manufacture(kind: MaterialKind) -> Option<Self> {
        kind.recipe_size()
            .map(|size| Self::new(kind, Bytes::from(vec![0u8; size])))
    }

    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manufactured_units_follow_recipe() {
        let pipe = Material::manufacture(MaterialKind::MetalPipe).expect("pipe recipe");
        assert_eq!(pipe.kind(), MaterialKind::MetalPipe);
        assert_eq!(pipe.payload().len(), 1024);

        let gravel = Material::manufacture(MaterialKind::Gravel).expect("gravel recipe");
        assert_eq!(gravel.payload().len(), 4096);
    }

    #[test]
    fn derived_kinds_cannot_be_manufactured() {
        assert!(Material::manufacture(MaterialKind::MetalPipeHalf).is_none());
        assert!(Material::manufacture(MaterialKind::Invalid).is_none());
        for kind in GENERATABLE_KINDS {
            assert!(kind.recipe_size().is_some(), "{kind} should be generatable");
        }
    }
}
