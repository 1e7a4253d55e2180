//! The resource graph builder.
//!
//! Turns raw `sys`-tagged JSON into typed resources: dispatches on
//! `sys.type`, coerces entry fields against their content type, resolves
//! links through the identity map (falling back to one bounded deferred
//! fetch), and registers everything so each identity has exactly one
//! live instance per session.
//!
//! Cycle safety comes from ordering, not from ownership tricks: a
//! resource's shell (sys only) is registered before any of its field
//! values are resolved, so resolving a link to it reads the existing
//! instance instead of recursing into a fresh build.

use crate::error::{BuildError, BuildResult, BuildWarning};
use crate::identity::IdentityMap;
use crate::resource::{
    Asset, AssetFile, DeletionMarker, Entry, Environment, FieldValue, LinkState,
    LocaleDefinition, Resource, Space,
};
use crate::transport::ResourceTransport;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use strata_schema::{ContentType, CoercionWarning, FieldDefinition, coerce_field};
use strata_types::{
    EnvironmentId, Link, LinkTarget, ResourceId, ResourceKey, ResourceLink, ResourceType, SpaceId,
    SystemProperties,
};
use tracing::{debug, warn};

/// Session configuration for a builder.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Space resources are assumed to belong to when `sys` omits one.
    pub space: SpaceId,
    /// Environment fallback, same role as `space`.
    pub environment: EnvironmentId,
    /// Locale variant selected from multi-locale documents.
    pub default_locale: String,
    /// Upper bound on a single deferred fetch; on expiry the link
    /// resolves to its broken marker instead of stalling the build.
    pub fetch_timeout: Duration,
}

impl BuilderConfig {
    /// Creates a config with the `en-US` locale and a 5 second fetch
    /// timeout.
    #[must_use]
    pub fn new(space: impl Into<SpaceId>, environment: impl Into<EnvironmentId>) -> Self {
        Self {
            space: space.into(),
            environment: environment.into(),
            default_locale: "en-US".to_string(),
            fetch_timeout: Duration::from_secs(5),
        }
    }

    /// Overrides the default locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Overrides the deferred-fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// The result of building a batch: successes in original order plus the
/// per-item failures and batch-level warnings. A failing item never
/// aborts the rest of the batch.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub resources: Vec<Arc<Resource>>,
    /// `(original index, error)` pairs, ordered by index.
    pub failures: Vec<(usize, BuildError)>,
    /// Batch-level warnings (stale updates ignored).
    pub warnings: Vec<BuildWarning>,
}

/// Builds typed resources from raw delivery-API JSON within one session.
///
/// The identity map is explicit and may be shared between builders to
/// extend a session across calls; it is never process-global.
pub struct ResourceBuilder {
    config: BuilderConfig,
    identity: Arc<IdentityMap>,
    transport: Arc<dyn ResourceTransport>,
}

impl ResourceBuilder {
    /// Creates a builder with a fresh identity map.
    #[must_use]
    pub fn new(config: BuilderConfig, transport: Arc<dyn ResourceTransport>) -> Self {
        Self::with_identity_map(config, transport, Arc::new(IdentityMap::new()))
    }

    /// Creates a builder over an existing session's identity map.
    #[must_use]
    pub fn with_identity_map(
        config: BuilderConfig,
        transport: Arc<dyn ResourceTransport>,
        identity: Arc<IdentityMap>,
    ) -> Self {
        Self {
            config,
            identity,
            transport,
        }
    }

    /// The session's identity map.
    #[must_use]
    pub fn identity_map(&self) -> &Arc<IdentityMap> {
        &self.identity
    }

    /// Looks up a registered resource, e.g. to follow a resolved link.
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<Resource>> {
        self.identity.get(key)
    }

    /// Builds one raw document into a typed, registered resource.
    ///
    /// Re-parsing an id at an unchanged revision returns the already
    /// registered instance (reference-equal); an older revision is
    /// ignored in favor of the cached instance; a newer revision
    /// replaces it wholesale.
    ///
    /// The future is boxed here, at the entry point: link resolution can
    /// recurse back into `build` through a deferred fetch, and the
    /// recursion must not feed into the future's own type.
    pub fn build<'a>(
        &'a self,
        raw: &'a Value,
    ) -> Pin<Box<dyn Future<Output = BuildResult<Arc<Resource>>> + Send + 'a>> {
        Box::pin(async move {
            let (sys, key) = self.parse_sys(raw)?;
            let previous = self.identity.get(&key);

            if let Some(existing) = &previous {
                if sys.revision() < existing.revision() {
                    debug!(
                        %key,
                        incoming = sys.revision(),
                        cached = existing.revision(),
                        "stale update ignored"
                    );
                    return Ok(existing.clone());
                }
                if sys.revision() == existing.revision() {
                    return Ok(existing.clone());
                }
            }

            // Shell first: links back to this resource must resolve while
            // its own fields are still being populated.
            let shell = Arc::new(self.shell(&sys));
            self.identity.promote(key.clone(), shell.clone());

            match self.populate(&sys, raw).await {
                Ok(resource) => Ok(self.identity.promote(key, Arc::new(resource))),
                Err(e) => {
                    self.identity.rollback(key, &shell, previous);
                    Err(e)
                }
            }
        })
    }

    /// Builds a batch of raw documents.
    ///
    /// All parseable items' shells are registered before any field or
    /// link resolution, so same-batch forward references and cycles
    /// resolve regardless of item order.
    pub async fn build_collection(&self, raws: &[Value]) -> CollectionOutcome {
        struct Pending {
            index: usize,
            sys: SystemProperties,
            key: ResourceKey,
            shell: Arc<Resource>,
            previous: Option<Arc<Resource>>,
        }

        let mut failures: Vec<(usize, BuildError)> = Vec::new();
        let mut warnings: Vec<BuildWarning> = Vec::new();
        // (index, key) for every item that has an instance to return.
        let mut planned: Vec<(usize, ResourceKey)> = Vec::new();
        let mut pending: Vec<Pending> = Vec::new();

        // Phase 1: register shells.
        for (index, raw) in raws.iter().enumerate() {
            let (sys, key) = match self.parse_sys(raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    failures.push((index, e));
                    continue;
                }
            };

            let previous = self.identity.get(&key);
            if let Some(existing) = &previous {
                if sys.revision() < existing.revision() {
                    debug!(
                        %key,
                        incoming = sys.revision(),
                        cached = existing.revision(),
                        "stale update ignored"
                    );
                    warnings.push(BuildWarning::StaleUpdateIgnored {
                        key: key.clone(),
                        incoming_revision: sys.revision(),
                        cached_revision: existing.revision(),
                    });
                    planned.push((index, key));
                    continue;
                }
                if sys.revision() == existing.revision() {
                    planned.push((index, key));
                    continue;
                }
            }

            let shell = Arc::new(self.shell(&sys));
            self.identity.promote(key.clone(), shell.clone());
            planned.push((index, key.clone()));
            pending.push(Pending {
                index,
                sys,
                key,
                shell,
                previous,
            });
        }

        // Phase 2: populate fields and resolve links. Schema and scope
        // resources go first so entries coerce against populated content
        // types, not shells; original item order is otherwise kept.
        pending.sort_by_key(|item| match item.sys.resource_type {
            ResourceType::ContentType => 0,
            ResourceType::Space | ResourceType::Environment | ResourceType::Locale => 1,
            ResourceType::DeletedEntry | ResourceType::DeletedAsset => 2,
            ResourceType::Asset => 3,
            ResourceType::Entry => 4,
        });
        for item in pending {
            match self.populate(&item.sys, &raws[item.index]).await {
                Ok(resource) => {
                    self.identity.promote(item.key, Arc::new(resource));
                }
                Err(e) => {
                    self.identity.rollback(item.key, &item.shell, item.previous);
                    failures.push((item.index, e));
                }
            }
        }

        let failed: std::collections::HashSet<usize> =
            failures.iter().map(|(index, _)| *index).collect();
        let mut resources = Vec::new();
        for (index, key) in planned {
            if failed.contains(&index) {
                continue;
            }
            match self.identity.get(&key) {
                Some(resource) => resources.push(resource),
                // A same-batch duplicate of an item whose populate failed
                // and was rolled back; it shares that outcome.
                None => failures.push((
                    index,
                    BuildError::malformed(format!("duplicate of a failed resource: {key}")),
                )),
            }
        }
        failures.sort_by_key(|(index, _)| *index);

        CollectionOutcome {
            resources,
            failures,
            warnings,
        }
    }

    // ── parsing and dispatch ─────────────────────────────────────

    fn parse_sys(&self, raw: &Value) -> BuildResult<(SystemProperties, ResourceKey)> {
        let obj = raw
            .as_object()
            .ok_or_else(|| BuildError::malformed("resource payload is not a JSON object"))?;
        let sys_value = obj
            .get("sys")
            .ok_or_else(|| BuildError::malformed("payload has no sys block"))?;
        let sys = SystemProperties::from_raw(sys_value)?;
        let key = ResourceKey::from_sys(&sys, &self.config.space, &self.config.environment);
        Ok((sys, key))
    }

    /// A sys-only placeholder of the right variant, registered before
    /// field resolution so cyclic references terminate.
    fn shell(&self, sys: &SystemProperties) -> Resource {
        let sys = sys.clone();
        match sys.resource_type {
            ResourceType::ContentType => Resource::ContentType(ContentType::new("", sys)),
            ResourceType::Entry => Resource::Entry(Entry::new(sys, Vec::new(), Vec::new())),
            ResourceType::Asset => Resource::Asset(Asset {
                sys,
                title: None,
                description: None,
                file: None,
                extra_fields: Map::new(),
                warnings: Vec::new(),
            }),
            ResourceType::Space => Resource::Space(Space { sys, name: None }),
            ResourceType::Environment => Resource::Environment(Environment { sys, name: None }),
            ResourceType::Locale => Resource::Locale(LocaleDefinition {
                sys,
                code: String::new(),
                name: None,
                default: false,
                fallback_code: None,
            }),
            ResourceType::DeletedEntry => Resource::DeletedEntry(DeletionMarker { sys }),
            ResourceType::DeletedAsset => Resource::DeletedAsset(DeletionMarker { sys }),
        }
    }

    async fn populate(&self, sys: &SystemProperties, raw: &Value) -> BuildResult<Resource> {
        match sys.resource_type {
            ResourceType::ContentType => Ok(Resource::ContentType(ContentType::from_raw(raw)?)),
            ResourceType::Entry => Ok(Resource::Entry(self.populate_entry(sys, raw).await?)),
            ResourceType::Asset => Ok(Resource::Asset(self.populate_asset(sys, raw))),
            ResourceType::Space => Ok(Resource::Space(Space {
                sys: sys.clone(),
                name: raw.get("name").and_then(Value::as_str).map(str::to_string),
            })),
            ResourceType::Environment => Ok(Resource::Environment(Environment {
                sys: sys.clone(),
                name: raw.get("name").and_then(Value::as_str).map(str::to_string),
            })),
            ResourceType::Locale => Ok(Resource::Locale(LocaleDefinition {
                sys: sys.clone(),
                code: raw
                    .get("code")
                    .and_then(Value::as_str)
                    .ok_or_else(|| BuildError::malformed("locale has no code"))?
                    .to_string(),
                name: raw.get("name").and_then(Value::as_str).map(str::to_string),
                default: raw.get("default").and_then(Value::as_bool).unwrap_or(false),
                fallback_code: raw
                    .get("fallbackCode")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })),
            ResourceType::DeletedEntry => {
                Ok(Resource::DeletedEntry(DeletionMarker { sys: sys.clone() }))
            }
            ResourceType::DeletedAsset => {
                Ok(Resource::DeletedAsset(DeletionMarker { sys: sys.clone() }))
            }
        }
    }

    // ── entries ──────────────────────────────────────────────────

    async fn populate_entry(&self, sys: &SystemProperties, raw: &Value) -> BuildResult<Entry> {
        let mut warnings = Vec::new();
        let mut fields = Vec::new();

        // Partial data is fine: an entry without fields is just empty.
        let raw_fields = raw.get("fields").and_then(Value::as_object);
        let mut schema = self.load_schema(sys).await;

        if let Some(raw_fields) = raw_fields {
            for (field_id, raw_value) in raw_fields {
                let def = schema.as_mut().map(|ct| {
                    if ct.field(field_id).is_none() {
                        debug!(field = %field_id, entry = %sys.id, "undeclared field, synthesizing Unknown definition");
                        ct.add_unknown_field(field_id.clone());
                    }
                    ct.field(field_id).expect("declared or just added").clone()
                });

                let value = self.select_locale(sys, def.as_ref(), raw_value);
                let field_value = self
                    .build_field_value(sys, def.as_ref(), field_id, value, &mut warnings)
                    .await;
                fields.push((field_id.clone(), field_value));
            }
        }

        Ok(Entry::new(sys.clone(), fields, warnings))
    }

    /// Loads the entry's content type from the identity map, fetching it
    /// once if unseen. The copy is session-local: unknown-field synthesis
    /// augments it for this entry's coercion without retrofitting the
    /// registered schema.
    async fn load_schema(&self, sys: &SystemProperties) -> Option<ContentType> {
        let link = sys.content_type.as_ref()?;
        let key = ResourceKey::new(
            ResourceType::ContentType,
            link.id().as_str(),
            self.effective_space(sys),
            self.effective_environment(sys),
            None,
        );

        if let Some(resource) = self.identity.get(&key)
            && let Some(ct) = resource.as_content_type()
            && !ct.name.is_empty()
        {
            return Some(ct.clone());
        }

        match self
            .fetch_and_build(ResourceType::ContentType, link.id(), None)
            .await
        {
            Some(resource) => resource
                .as_content_type()
                .filter(|ct| !ct.name.is_empty())
                .cloned(),
            None => {
                warn!(content_type = %link.id(), entry = %sys.id, "content type unavailable, entry fields kept raw");
                None
            }
        }
    }

    /// Selects the session locale's variant from multi-locale documents
    /// (no `sys.locale`); single-locale documents pass through.
    fn select_locale(
        &self,
        sys: &SystemProperties,
        def: Option<&FieldDefinition>,
        value: &Value,
    ) -> Value {
        if sys.locale.is_some() {
            return value.clone();
        }
        let Value::Object(variants) = value else {
            return value.clone();
        };
        if let Some(variant) = variants.get(&self.config.default_locale) {
            return variant.clone();
        }
        // A single variant under some other locale: better than nothing.
        // Without a schema the key must look like a locale tag, or an
        // ordinary one-key object would be unwrapped as a locale map.
        if variants.len() == 1
            && let Some((code, variant)) = variants.iter().next()
            && (def.is_some_and(|d| d.localized) || (def.is_none() && looks_like_locale(code)))
        {
            return variant.clone();
        }
        value.clone()
    }

    async fn build_field_value(
        &self,
        sys: &SystemProperties,
        def: Option<&FieldDefinition>,
        field_id: &str,
        value: Value,
        warnings: &mut Vec<BuildWarning>,
    ) -> FieldValue {
        if let Some(link) = Link::from_raw(&value) {
            return FieldValue::Link(self.resolve_link(sys, field_id, link, warnings).await);
        }

        if let Value::Array(elements) = &value {
            let is_link_array = def.is_some_and(FieldDefinition::is_link_array)
                || elements.iter().any(|e| Link::from_raw(e).is_some());
            if is_link_array {
                let mut resolved = Vec::with_capacity(elements.len());
                for element in elements {
                    match Link::from_raw(element) {
                        Some(link) => resolved.push(FieldValue::Link(
                            self.resolve_link(sys, field_id, link, warnings).await,
                        )),
                        None => resolved.push(FieldValue::Scalar(element.clone())),
                    }
                }
                return FieldValue::Array(resolved);
            }
        }

        match def {
            Some(def) => {
                let (coerced, coercion_warnings) = coerce_field(def, value);
                warnings.extend(
                    coercion_warnings
                        .into_iter()
                        .map(BuildWarning::FieldCoercion),
                );
                FieldValue::Scalar(coerced)
            }
            // No schema available: keep the raw value untouched.
            None => FieldValue::Scalar(value),
        }
    }

    // ── link resolution ──────────────────────────────────────────

    /// Resolves one link: identity map first (same batch or prior
    /// session state), then one bounded deferred fetch, then the
    /// explicit broken marker.
    async fn resolve_link(
        &self,
        sys: &SystemProperties,
        field_id: &str,
        link: Link,
        warnings: &mut Vec<BuildWarning>,
    ) -> LinkState {
        let space = self.effective_space(sys);
        let environment = self.effective_environment(sys);
        let locale = sys.locale.as_deref();

        let localized_key = ResourceKey::from_link(&link, &space, &environment, locale);
        if self.identity.get(&localized_key).is_some() {
            return LinkState::Resolved(localized_key);
        }
        if locale.is_some() {
            // The target may be registered as a locale-agnostic instance.
            let plain_key = localized_key.clone().with_locale(None);
            if self.identity.get(&plain_key).is_some() {
                return LinkState::Resolved(plain_key);
            }
        }

        let tombstone_type = match link.link_type {
            LinkTarget::Entry => ResourceType::DeletedEntry,
            LinkTarget::Asset => ResourceType::DeletedAsset,
        };
        let tombstone_key = ResourceKey::new(
            tombstone_type,
            link.target.as_str(),
            space,
            environment,
            None,
        );
        if self.identity.get(&tombstone_key).is_some() {
            debug!(%link, field = %field_id, "link target is deleted");
            warnings.push(BuildWarning::UnresolvableLink {
                field_id: field_id.to_string(),
                link: link.clone(),
            });
            return LinkState::Broken(link);
        }

        let target_type = match link.link_type {
            LinkTarget::Entry => ResourceType::Entry,
            LinkTarget::Asset => ResourceType::Asset,
        };
        if let Some(resource) = self.fetch_and_build(target_type, &link.target, locale).await
            && !resource.sys().resource_type.is_deletion_marker()
        {
            let key =
                ResourceKey::from_sys(resource.sys(), &self.config.space, &self.config.environment);
            return LinkState::Resolved(key);
        }

        warn!(%link, field = %field_id, "unresolvable link");
        warnings.push(BuildWarning::UnresolvableLink {
            field_id: field_id.to_string(),
            link: link.clone(),
        });
        LinkState::Broken(link)
    }

    /// One deferred fetch, bounded by the session timeout. Every failure
    /// mode returns `None`; the caller degrades rather than aborts.
    async fn fetch_and_build(
        &self,
        resource_type: ResourceType,
        id: &ResourceId,
        locale: Option<&str>,
    ) -> Option<Arc<Resource>> {
        let fetched = tokio::time::timeout(
            self.config.fetch_timeout,
            self.transport.fetch_resource(
                resource_type,
                id,
                &self.config.space,
                &self.config.environment,
                locale,
            ),
        )
        .await;

        let raw = match fetched {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!(%id, %resource_type, "deferred fetch: not found");
                return None;
            }
            Ok(Err(e)) => {
                warn!(%id, %resource_type, error = %e, "deferred fetch failed");
                return None;
            }
            Err(_) => {
                warn!(%id, %resource_type, "deferred fetch timed out");
                return None;
            }
        };

        match self.build(&raw).await {
            Ok(resource) => Some(resource),
            Err(e) => {
                warn!(%id, %resource_type, error = %e, "fetched resource failed to build");
                None
            }
        }
    }

    // ── assets ───────────────────────────────────────────────────

    fn populate_asset(&self, sys: &SystemProperties, raw: &Value) -> Asset {
        let mut asset = Asset {
            sys: sys.clone(),
            title: None,
            description: None,
            file: None,
            extra_fields: Map::new(),
            warnings: Vec::new(),
        };

        let Some(raw_fields) = raw.get("fields").and_then(Value::as_object) else {
            return asset;
        };

        for (field_id, raw_value) in raw_fields {
            let value = self.select_locale(sys, None, raw_value);
            match field_id.as_str() {
                "title" => match value.as_str() {
                    Some(title) => asset.title = Some(title.to_string()),
                    None => {
                        asset.warnings.push(BuildWarning::FieldCoercion(
                            CoercionWarning::new("title", "expected a string", &value),
                        ));
                        asset.extra_fields.insert(field_id.clone(), value);
                    }
                },
                "description" => match value.as_str() {
                    Some(description) => asset.description = Some(description.to_string()),
                    None => {
                        asset.warnings.push(BuildWarning::FieldCoercion(
                            CoercionWarning::new("description", "expected a string", &value),
                        ));
                        asset.extra_fields.insert(field_id.clone(), value);
                    }
                },
                "file" => match serde_json::from_value::<AssetFile>(value.clone()) {
                    Ok(file) => asset.file = Some(file),
                    Err(e) => {
                        asset.warnings.push(BuildWarning::FieldCoercion(
                            CoercionWarning::new("file", e.to_string(), &value),
                        ));
                        asset.extra_fields.insert(field_id.clone(), value);
                    }
                },
                _ => {
                    asset.extra_fields.insert(field_id.clone(), value);
                }
            }
        }

        asset
    }

    // ── helpers ──────────────────────────────────────────────────

    fn effective_space(&self, sys: &SystemProperties) -> SpaceId {
        sys.space
            .as_ref()
            .map_or_else(|| self.config.space.clone(), link_space_id)
    }

    fn effective_environment(&self, sys: &SystemProperties) -> EnvironmentId {
        sys.environment.as_ref().map_or_else(
            || self.config.environment.clone(),
            |link| EnvironmentId::new(link.id().as_str()),
        )
    }
}

fn link_space_id(link: &ResourceLink) -> SpaceId {
    SpaceId::new(link.id().as_str())
}

/// BCP 47-ish shape check: a 2-3 letter lowercase language subtag
/// followed by at least one alphanumeric subtag ("en-US", "zh-Hans").
/// Bare keys ("url", "id") must not pass, so the language alone is not
/// enough.
fn looks_like_locale(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let language = subtags.next().unwrap_or_default();
    let mut rest = subtags.peekable();
    (2..=3).contains(&language.len())
        && language.bytes().all(|b| b.is_ascii_lowercase())
        && rest.peek().is_some()
        && rest.all(|s| (2..=8).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric()))
}
