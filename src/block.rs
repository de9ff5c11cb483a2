//! `block` contains the [`Block`] struct that fills every cell of a [`VolumeBuffer`](crate::VolumeBuffer)
//! and every position of a [`MemoryWorld`](crate::MemoryWorld).

use crate::error::{Error, Result};
use std::{borrow::Cow, collections::BTreeMap, fmt::Debug};

/// A Minecraft [Block](https://minecraft.wiki/w/Block) state, used when filling buffers or setting blocks
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Block {
    /// Always namespaced, `minecraft:` is added if no namespace was given
    pub name: String,
    pub properties: Option<BTreeMap<String, String>>,
}

impl Block {
    pub const AIR: &'static str = "minecraft:air";

    /// Creates a new block from just an id, without validating it.
    ///
    /// Auto populates into minecraft namespace if no namespace was given.
    /// Use [`Block::try_new`] for ids coming from users.
    ///
    /// ## Example
    /// ```no_run
    /// let beacon = Block::new("beacon");
    /// assert_eq!(beacon.name, "minecraft:beacon");
    /// ```
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Block {
            name: Self::populate_namespace(id.as_ref()).into_owned(),
            properties: None,
        }
    }

    /// Tries to create a new block from it's id.
    ///
    /// Fails with [`Error::InvalidBlock`] if the id is empty, has more than one namespace
    /// separator or contains characters outside of `[a-z0-9_.-]` (`/` is also allowed in the path).
    ///
    /// ## Example
    /// ```no_run
    /// let beacon = Block::try_new("beacon")?;
    /// ```
    pub fn try_new<S: AsRef<str>>(id: S) -> Result<Self> {
        let id = id.as_ref().trim();
        Self::validate_id(id)?;
        Ok(Self::new(id))
    }

    /// The default cell value of any buffer or unset world position
    pub fn air() -> Self {
        Self::new(Self::AIR)
    }

    pub fn is_air(&self) -> bool {
        self.name == Self::AIR
    }

    /// Populates a namespace to the id if none is given.
    ///
    /// Defaults to `minecraft:<id>`
    pub(crate) fn populate_namespace(id: &str) -> Cow<'_, str> {
        if !id.contains(':') {
            Cow::Owned(String::from("minecraft:") + id)
        } else {
            Cow::Borrowed(id)
        }
    }

    fn validate_id(id: &str) -> Result<()> {
        let invalid = || Error::InvalidBlock(id.to_string());

        let (namespace, path) = match id.split_once(':') {
            Some((namespace, path)) => (Some(namespace), path),
            None => (None, id),
        };

        let namespace_ok = namespace.is_none_or(|n| {
            !n.is_empty()
                && n.chars()
                    .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-'))
        });
        let path_ok = !path.is_empty()
            && path
                .chars()
                .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-' | '/'));

        if namespace_ok && path_ok {
            Ok(())
        } else {
            Err(invalid())
        }
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::air()
    }
}

impl Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // writes it in format of "<id>" if only id
        // if props, then <id>[<key>=<value>, <key>=<value>, ...]
        write!(
            f,
            "{}{}",
            self.name,
            if let Some(props) = &self.properties {
                format!(
                    "[{}]",
                    props
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<String>>()
                        .join(", ")
                )
            } else {
                "".to_owned()
            }
        )
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Block {
    fn from(value: &str) -> Self {
        Block::new(value)
    }
}

impl From<String> for Block {
    fn from(value: String) -> Self {
        Block::new(value)
    }
}
