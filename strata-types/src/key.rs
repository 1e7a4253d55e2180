//! Composite key for the session-scoped identity map.

use crate::ids::{EnvironmentId, ResourceId, SpaceId};
use crate::link::{Link, LinkTarget};
use crate::sys::{ResourceType, SystemProperties};
use std::fmt;

/// Identity-map key: at most one live resource instance exists per key
/// within a builder session.
///
/// The locale component is set only for localized entry/asset instances;
/// schema-level resources (content types, spaces, locales themselves) are
/// locale-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub resource_type: ResourceType,
    pub id: ResourceId,
    pub space: SpaceId,
    pub environment: EnvironmentId,
    pub locale: Option<String>,
}

impl ResourceKey {
    /// Creates a key from explicit components.
    #[must_use]
    pub fn new(
        resource_type: ResourceType,
        id: impl Into<ResourceId>,
        space: impl Into<SpaceId>,
        environment: impl Into<EnvironmentId>,
        locale: Option<String>,
    ) -> Self {
        Self {
            resource_type,
            id: id.into(),
            space: space.into(),
            environment: environment.into(),
            locale,
        }
    }

    /// Derives the key for a parsed resource, falling back to the
    /// session's defaults where `sys` omits the space or environment.
    ///
    /// The locale participates only for entries and assets, matching how
    /// the delivery API scopes localized instances.
    #[must_use]
    pub fn from_sys(sys: &SystemProperties, space: &SpaceId, environment: &EnvironmentId) -> Self {
        let locale = match sys.resource_type {
            ResourceType::Entry | ResourceType::Asset => sys.locale.clone(),
            _ => None,
        };
        Self {
            resource_type: sys.resource_type,
            id: sys.id.clone(),
            space: sys
                .space
                .as_ref()
                .map_or_else(|| space.clone(), |l| SpaceId::new(l.id().as_str())),
            environment: sys.environment.as_ref().map_or_else(
                || environment.clone(),
                |l| EnvironmentId::new(l.id().as_str()),
            ),
            locale,
        }
    }

    /// Derives the key a field-level link resolves through, scoped to the
    /// current space/environment and (for localized graphs) locale.
    #[must_use]
    pub fn from_link(
        link: &Link,
        space: &SpaceId,
        environment: &EnvironmentId,
        locale: Option<&str>,
    ) -> Self {
        let resource_type = match link.link_type {
            LinkTarget::Entry => ResourceType::Entry,
            LinkTarget::Asset => ResourceType::Asset,
        };
        Self {
            resource_type,
            id: link.target.clone(),
            space: space.clone(),
            environment: environment.clone(),
            locale: locale.map(str::to_string),
        }
    }

    /// The same key with a different locale component.
    #[must_use]
    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}:{}",
            self.resource_type, self.id, self.space, self.environment
        )?;
        if let Some(locale) = &self.locale {
            write!(f, "#{locale}")?;
        }
        Ok(())
    }
}
