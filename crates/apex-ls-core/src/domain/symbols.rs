//! Symbol model as exchanged with the symbol manager.
//!
//! Only the parts the validators read are modelled here; the symbol manager
//! itself is an external collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Class,
    Interface,
    Enum,
    EnumValue,
    Method,
    Constructor,
    Property,
    Field,
    Variable,
    Parameter,
}

impl SymbolKind {
    /// Kinds that declare a type another symbol can reference.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Private,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_virtual: bool,
    pub is_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_uri: String,
    /// Name of the enclosing type, if any.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub return_type: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, file_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            file_uri: file_uri.into(),
            parent: None,
            modifiers: Modifiers::default(),
            superclass: None,
            interfaces: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Parameter types in declaration order, lower-cased (Apex type names
    /// are case-insensitive).
    pub fn signature_key(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|p| p.type_name.to_ascii_lowercase())
            .collect()
    }
}

/// Symbols compiled from one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolTable {
    pub file_uri: String,
    pub symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new(file_uri: impl Into<String>) -> Self {
        Self {
            file_uri: file_uri.into(),
            symbols: Vec::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    pub fn types(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.kind.is_type())
    }

    /// Members declared directly inside `type_name`.
    pub fn members_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols.iter().filter(move |s| {
            s.parent
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(type_name))
        })
    }

    /// Case-insensitive lookup of a type declared in this file.
    pub fn find_type(&self, name: &str) -> Option<&Symbol> {
        self.types().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_type_is_case_insensitive() {
        let table = SymbolTable::new("file:///A.cls")
            .with_symbol(Symbol::new("ClassA", SymbolKind::Class, "file:///A.cls"))
            .with_symbol(
                Symbol::new("run", SymbolKind::Method, "file:///A.cls").with_parent("ClassA"),
            );
        assert!(table.find_type("classa").is_some());
        assert!(table.find_type("run").is_none());
        assert_eq!(table.members_of("CLASSA").count(), 1);
    }

    #[test]
    fn signature_key_ignores_parameter_names() {
        let a = Symbol::new("m", SymbolKind::Method, "u")
            .with_parameter(Parameter::new("x", "String"));
        let b = Symbol::new("m", SymbolKind::Method, "u")
            .with_parameter(Parameter::new("y", "string"));
        assert_eq!(a.signature_key(), b.signature_key());
    }
}
