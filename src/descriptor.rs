use std::marker::PhantomData;

/// Identifies a schema-defined service by its fully qualified type name,
/// e.g. `logi.files.FilesService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub type_name: &'static str,
}

impl ServiceDescriptor {
    pub const fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Unary,
}

/// One method of a service, typed by its request and response messages.
///
/// The messages themselves are their own schema: `I` and `O` are prost
/// messages, so encode/decode come from the `prost::Message` impls.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor<I, O> {
    pub name: &'static str,
    pub kind: MethodKind,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O> MethodDescriptor<I, O> {
    pub const fn new(name: &'static str, kind: MethodKind) -> Self {
        Self {
            name,
            kind,
            _marker: PhantomData,
        }
    }
}
