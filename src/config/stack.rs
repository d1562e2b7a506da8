//! Configuration scopes and dotted-key lookup
//!
//! Lookups consult the runtime scope first, then every file scope in the order
//! it was pushed. The first scope that defines a key wins; [`ConfigStack::gather`]
//! instead concatenates list values from every scope.

use super::ConfigError;
use toml_edit::{DocumentMut, Item, Table, Value};

/// One named configuration document
#[derive(Debug, Clone)]
pub struct ConfigScope {
    /// Scope name used in log messages ("local", "shared", ...)
    pub name: String,
    /// Parsed document
    pub doc: DocumentMut,
}

/// Runtime overrides stacked over file scopes
#[derive(Debug, Clone, Default)]
pub struct ConfigStack {
    runtime: DocumentMut,
    scopes: Vec<ConfigScope>,
}

/// Conversion from a TOML item to a Rust value
pub trait ConfigValue: Sized {
    /// Description used in [`ConfigError::InvalidValue`]
    const EXPECTED: &'static str;

    /// Convert the item, `None` when it holds another kind of value
    fn from_item(item: &Item) -> Option<Self>;
}

impl ConfigValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_item(item: &Item) -> Option<Self> {
        item.as_str().map(str::to_string)
    }
}

impl ConfigValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_item(item: &Item) -> Option<Self> {
        item.as_bool()
    }
}

impl ConfigValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_item(item: &Item) -> Option<Self> {
        item.as_float()
            .or_else(|| item.as_integer().map(|i| i as f64))
    }
}

impl ConfigValue for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_item(item: &Item) -> Option<Self> {
        item.as_integer().and_then(|i| u64::try_from(i).ok())
    }
}

impl ConfigStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML string into a new scope pushed below the existing ones
    ///
    /// # Examples
    ///
    /// ```
    /// use perfcheck::config::ConfigStack;
    ///
    /// let mut config = ConfigStack::new();
    /// config.push_toml("local", "[degradation]\napply = \"first\"")?;
    /// assert_eq!(config.lookup_as::<String>("degradation.apply")?, "first");
    /// # Ok::<(), perfcheck::config::ConfigError>(())
    /// ```
    pub fn push_toml(&mut self, name: &str, contents: &str) -> Result<(), ConfigError> {
        let doc = contents
            .parse::<DocumentMut>()
            .map_err(|source| ConfigError::Parse {
                path: name.into(),
                source,
            })?;
        self.push_scope(name, doc);
        Ok(())
    }

    /// Push an already parsed scope below the existing ones
    pub fn push_scope(&mut self, name: &str, doc: DocumentMut) {
        self.scopes.push(ConfigScope {
            name: name.to_string(),
            doc,
        });
    }

    /// Names of the file scopes, highest priority first
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|s| s.name.as_str())
    }

    /// Set a runtime override, creating intermediate tables as needed
    pub fn set_runtime(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let mut parts: Vec<&str> = key.split('.').collect();
        let leaf = parts.pop().unwrap_or(key);

        let mut table: &mut Table = self.runtime.as_table_mut();
        for part in parts {
            let entry = table.entry(part).or_insert(Item::Table(Table::new()));
            table = entry.as_table_mut().ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                expected: "a table path".to_string(),
                found: format!("non-table value at '{}'", part),
            })?;
        }
        table.insert(leaf, Item::Value(value.into()));
        Ok(())
    }

    /// Find the highest priority definition of a dotted key
    pub fn get(&self, key: &str) -> Option<&Item> {
        std::iter::once(&self.runtime)
            .chain(self.scopes.iter().map(|s| &s.doc))
            .find_map(|doc| find_in(doc, key))
    }

    /// Look up a dotted key, failing when no scope defines it
    pub fn lookup(&self, key: &str) -> Result<&Item, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Look up a dotted key and convert it
    pub fn lookup_as<T: ConfigValue>(&self, key: &str) -> Result<T, ConfigError> {
        convert(key, self.lookup(key)?)
    }

    /// Look up an optional dotted key, falling back to `default` when unset
    ///
    /// A key that is set to the wrong kind of value is still an error.
    pub fn lookup_or<T: ConfigValue>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(item) => convert(key, item),
            None => Ok(default),
        }
    }

    /// Concatenate the list values of a key across all scopes, highest priority first
    ///
    /// Arrays of tables yield one table item per entry, plain arrays one value
    /// item per element and scalar definitions themselves.
    pub fn gather(&self, key: &str) -> Vec<Item> {
        let mut gathered = Vec::new();
        for doc in std::iter::once(&self.runtime).chain(self.scopes.iter().map(|s| &s.doc)) {
            match find_in(doc, key) {
                Some(Item::ArrayOfTables(tables)) => {
                    gathered.extend(tables.iter().cloned().map(Item::Table));
                }
                Some(Item::Value(Value::Array(values))) => {
                    gathered.extend(values.iter().cloned().map(Item::Value));
                }
                Some(Item::None) | None => {}
                Some(other) => gathered.push(other.clone()),
            }
        }
        gathered
    }
}

fn find_in<'a>(doc: &'a DocumentMut, key: &str) -> Option<&'a Item> {
    let mut item = doc.as_item();
    for part in key.split('.') {
        item = item.get(part)?;
    }
    (!item.is_none()).then_some(item)
}

fn convert<T: ConfigValue>(key: &str, item: &Item) -> Result<T, ConfigError> {
    T::from_item(item).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        expected: T::EXPECTED.to_string(),
        found: item.to_string().trim().to_string(),
    })
}
