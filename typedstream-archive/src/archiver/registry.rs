/*!
 The registry of decoders for classes and structs with a known shape.

 When the [`Unarchiver`] reads an object, it looks up the name of the object's most derived class here.
 If a [`DecodeStrategy`] is registered, it builds the object; otherwise the object is read generically.
 Structs work the same way, keyed by their full type encoding.

 The process-wide registry starts out with the [`foundation`](crate::foundation) types. Registering a
 decoder replaces the registry snapshot for future decoding passes; passes that already started keep the
 snapshot they were created with.
*/

use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    rc::Rc,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use crate::{
    archiver::{
        models::{Class, KnownType, Value},
        unarchiver::Unarchiver,
    },
    encodings::build_struct_encoding,
    error::archive::UnarchiveError,
    foundation,
};

/// Builds a known object from the [`Unarchiver`], given the object's class.
///
/// The strategy must read exactly the values stored for the object; the [`Unarchiver`] requires
/// the end of the object afterwards.
pub type DecodeStrategy =
    fn(&mut Unarchiver<'_>, &Rc<Class>) -> Result<Box<dyn KnownType>, UnarchiveError>;

/// Builds a known struct from its decoded fields
pub type StructBuilder = fn(Vec<Value>) -> Result<Rc<dyn KnownType>, UnarchiveError>;

/// A decoder for a struct with a known name and fields
#[derive(Clone)]
pub struct StructDecoder {
    /// The name of the struct
    pub name: &'static str,
    /// The encodings of the struct fields, in order
    pub field_encodings: &'static [&'static str],
    /// Builds the struct from the decoded field values
    pub build: StructBuilder,
}

impl StructDecoder {
    /// The full type encoding of the struct, i.e. `{_NSPoint=ff}`
    pub fn encoding(&self) -> String {
        build_struct_encoding(self.field_encodings, Some(self.name))
    }
}

impl Debug for StructDecoder {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("StructDecoder")
            .field("name", &self.name)
            .field("field_encodings", &self.field_encodings)
            .finish()
    }
}

/// Maps archived class names and struct encodings to decoders
#[derive(Clone, Default)]
pub struct KnownTypeRegistry {
    classes: HashMap<String, DecodeStrategy>,
    structs: HashMap<String, StructDecoder>,
}

impl KnownTypeRegistry {
    /// Create a registry without any decoders
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with decoders for the [`foundation`] types
    pub fn with_foundation() -> Self {
        let mut registry = Self::new();
        foundation::register_all(&mut registry);
        registry
    }

    /// Register a decoder for a class name, replacing any previous decoder for that name
    pub fn register(&mut self, class_name: impl Into<String>, strategy: DecodeStrategy) {
        self.classes.insert(class_name.into(), strategy);
    }

    /// Register a decoder for a struct, replacing any previous decoder for its encoding
    pub fn register_struct(&mut self, decoder: StructDecoder) {
        self.structs.insert(decoder.encoding(), decoder);
    }

    /// Get the decoder for an exact class name
    pub fn strategy(&self, class_name: &str) -> Option<DecodeStrategy> {
        self.classes.get(class_name).copied()
    }

    /// Get the decoder for an exact struct encoding
    pub fn struct_decoder(&self, encoding: &str) -> Option<&StructDecoder> {
        self.structs.get(encoding)
    }

    /// Iterate over the registered class names, in no particular order
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl Debug for KnownTypeRegistry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut classes: Vec<&str> = self.class_names().collect();
        classes.sort_unstable();
        let mut structs: Vec<&str> = self.structs.keys().map(String::as_str).collect();
        structs.sort_unstable();
        fmt.debug_struct("KnownTypeRegistry")
            .field("classes", &classes)
            .field("structs", &structs)
            .finish()
    }
}

fn global_registry() -> &'static RwLock<Arc<KnownTypeRegistry>> {
    static GLOBAL: OnceLock<RwLock<Arc<KnownTypeRegistry>>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(KnownTypeRegistry::with_foundation())))
}

/// Get a snapshot of the process-wide registry
pub fn global() -> Arc<KnownTypeRegistry> {
    let registry = global_registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(&*registry)
}

/// Register a class decoder in the process-wide registry
///
/// Call this during program initialization, before decoding.
pub fn register(class_name: impl Into<String>, strategy: DecodeStrategy) {
    let mut registry = global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::make_mut(&mut *registry).register(class_name, strategy);
}

/// Register a struct decoder in the process-wide registry
pub fn register_struct(decoder: StructDecoder) {
    let mut registry = global_registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::make_mut(&mut *registry).register_struct(decoder);
}

#[cfg(test)]
mod registry_tests {
    use std::rc::Rc;

    use crate::{
        archiver::{
            models::{Class, KnownType},
            registry::{global, register, KnownTypeRegistry},
            unarchiver::Unarchiver,
        },
        error::archive::UnarchiveError,
        foundation::object::NSObject,
    };

    fn decode_marker(
        _: &mut Unarchiver<'_>,
        _: &Rc<Class>,
    ) -> Result<Box<dyn KnownType>, UnarchiveError> {
        Ok(Box::new(NSObject))
    }

    #[test]
    fn can_register_and_lookup() {
        let mut registry = KnownTypeRegistry::new();
        assert!(registry.strategy("Marker").is_none());

        registry.register("Marker", decode_marker);
        assert!(registry.strategy("Marker").is_some());
        assert!(registry.strategy("marker").is_none());
    }

    #[test]
    fn foundation_is_registered() {
        let registry = KnownTypeRegistry::with_foundation();
        for name in ["NSObject", "NSString", "NSMutableDictionary", "NSAttributedString"] {
            assert!(registry.strategy(name).is_some(), "{name} is missing");
        }
        assert!(registry.struct_decoder("{_NSPoint=ff}").is_some());
        assert!(registry.struct_decoder("{_NSPoint=ii}").is_none());
    }

    #[test]
    fn global_snapshot_is_stable() {
        let before = global();
        register("GlobalRegistryTestMarker", decode_marker);
        let after = global();

        assert!(before.strategy("GlobalRegistryTestMarker").is_none());
        assert!(after.strategy("GlobalRegistryTestMarker").is_some());
    }
}
