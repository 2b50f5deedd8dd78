//! Schema-aware dictionary projections of a configuration tree.
//!
//! A [`DictView`] is the plain nested mapping generators consume. It is built
//! by a [`Projector`] from the JSON projection of a [`ConfigTree`] and a
//! [`DictOptions`] set:
//!
//! 1. the subtree at the requested path is extracted;
//! 2. single-element lists are optionally collapsed;
//! 3. schema defaults are computed against the unmangled data;
//! 4. keys of data and defaults are mangled, keeping tag values verbatim;
//! 5. defaults fill holes in the data, and each synthesized key is recorded;
//! 6. the `pki` subtree is optionally attached.
//!
//! The view remembers its options, so defaults can be merged later with
//! [`Projector::merge_defaults`].

use std::borrow::Cow;
use std::ops::Deref;

use serde_json::{Map, Value};
use tracing::trace;

use crate::path::ConfigPath;
use crate::schema::{DefaultsMeta, Schema};
use crate::tree::ConfigTree;

mod defaults;
mod errors;
mod mangle;
mod pki;

pub use defaults::{merge_defaults, relative_defaults};
pub use errors::ViewError;
pub use mangle::KeyMangling;
pub use pki::{AcmeFileRewriter, PkiRewriter, pem_body};

/// Options controlling a projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictOptions {
    /// Subtree root, relative to the edit level.
    pub path: ConfigPath,
    /// Project the running tree instead of the proposed tree.
    pub effective: bool,
    /// Return the content under the last path token instead of wrapping it.
    pub get_first_key: bool,
    /// Render single-value lists as bare strings.
    pub no_multi_convert: bool,
    /// Key renaming applied to every non-tag-value key.
    pub key_mangling: Option<KeyMangling>,
    /// Preserve tag values found in the tree even if the schema does not
    /// know them.
    pub no_tag_node_value_mangle: bool,
    /// Merge the defaults of the projected level.
    pub with_defaults: bool,
    /// Merge the defaults of every descendant.
    pub with_recursive_defaults: bool,
    /// Attach the `pki` subtree.
    pub with_pki: bool,
}

impl DictOptions {
    pub fn at(path: ConfigPath) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn effective(mut self) -> Self {
        self.effective = true;
        self
    }

    pub fn get_first_key(mut self) -> Self {
        self.get_first_key = true;
        self
    }

    pub fn no_multi_convert(mut self) -> Self {
        self.no_multi_convert = true;
        self
    }

    pub fn key_mangling(mut self, mangling: KeyMangling) -> Self {
        self.key_mangling = Some(mangling);
        self
    }

    pub fn no_tag_node_value_mangle(mut self) -> Self {
        self.no_tag_node_value_mangle = true;
        self
    }

    pub fn with_defaults(mut self) -> Self {
        self.with_defaults = true;
        self
    }

    pub fn with_recursive_defaults(mut self) -> Self {
        self.with_recursive_defaults = true;
        self
    }

    pub fn with_pki(mut self) -> Self {
        self.with_pki = true;
        self
    }

    fn wants_defaults(&self) -> bool {
        self.with_defaults || self.with_recursive_defaults
    }
}

/// A projected mapping plus the options and defaults origin it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct DictView {
    data: Map<String, Value>,
    options: DictOptions,
    from_defaults: DefaultsMeta,
}

impl DictView {
    pub fn options(&self) -> &DictOptions {
        &self.options
    }

    /// Keys synthesized from defaults, relative to the view root.
    pub fn defaults_meta(&self) -> &DefaultsMeta {
        &self.from_defaults
    }

    /// True if the entry at `path` (view-relative, mangled keys) was filled
    /// from schema defaults.
    pub fn from_defaults(&self, path: &ConfigPath) -> bool {
        self.from_defaults.contains(path)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

impl Deref for DictView {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// Builds projections of one tree.
#[derive(Debug)]
pub struct Projector<'a> {
    tree: &'a ConfigTree,
    root: Cow<'a, Map<String, Value>>,
    schema: &'a dyn Schema,
    pki: Option<&'a dyn PkiRewriter>,
}

impl<'a> Projector<'a> {
    pub fn new(tree: &'a ConfigTree, schema: &'a dyn Schema) -> Self {
        let root = match tree.to_json_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            tree,
            root: Cow::Owned(root),
            schema,
            pki: None,
        }
    }

    /// Uses an already computed JSON projection of `tree`.
    pub fn with_root(
        tree: &'a ConfigTree,
        root: &'a Map<String, Value>,
        schema: &'a dyn Schema,
    ) -> Self {
        Self {
            tree,
            root: Cow::Borrowed(root),
            schema,
            pki: None,
        }
    }

    pub fn with_pki_rewriter(mut self, rewriter: &'a dyn PkiRewriter) -> Self {
        self.pki = Some(rewriter);
        self
    }

    /// Projects the subtree at the absolute path `lpath`.
    pub fn dict(&self, lpath: &ConfigPath, options: &DictOptions) -> Result<DictView, ViewError> {
        let data = self.base_data(lpath, options)?;
        let defaults = options
            .wants_defaults()
            .then(|| self.defaults_from(lpath, &data, options));
        let mut data = self.mangle(data, lpath, options);

        let mut meta = DefaultsMeta::new();
        if let Some(defaults) = defaults {
            merge_defaults(&mut data, defaults, &ConfigPath::root(), &mut meta);
        }

        if options.with_pki
            && !data.is_empty()
            && let Some(pki) = self.pki_dict()?
        {
            data.insert("pki".to_string(), Value::Object(pki));
        }

        trace!(path = %lpath, keys = data.len(), defaults = meta.len(), "Projected configuration");
        Ok(DictView {
            data,
            options: options.clone(),
            from_defaults: meta,
        })
    }

    /// Only the defaults a projection with `options` would merge.
    pub fn defaults(&self, lpath: &ConfigPath, options: &DictOptions) -> Result<Map<String, Value>, ViewError> {
        let data = self.base_data(lpath, options)?;
        Ok(self.defaults_from(lpath, &data, options))
    }

    /// Merges defaults into an existing view, using the options it was built
    /// with. Merging twice changes nothing.
    pub fn merge_defaults(
        &self,
        lpath: &ConfigPath,
        view: DictView,
        recursive: bool,
    ) -> Result<DictView, ViewError> {
        let DictView {
            mut data,
            mut options,
            from_defaults: mut meta,
        } = view;
        options.with_defaults = true;
        options.with_recursive_defaults = recursive;

        let defaults = self.defaults(lpath, &options)?;
        merge_defaults(&mut data, defaults, &ConfigPath::root(), &mut meta);
        Ok(DictView {
            data,
            options,
            from_defaults: meta,
        })
    }

    /// Steps 1 and 2: extraction and list collapsing.
    fn base_data(&self, lpath: &ConfigPath, options: &DictOptions) -> Result<Map<String, Value>, ViewError> {
        let mut data = sub_dict(&self.root, lpath, options.get_first_key)?;
        if options.no_multi_convert {
            collapse_single_lists(&mut data);
        }
        Ok(data)
    }

    /// Defaults shaped like `data`, mangled the same way.
    fn defaults_from(
        &self,
        lpath: &ConfigPath,
        data: &Map<String, Value>,
        options: &DictOptions,
    ) -> Map<String, Value> {
        let recursive = options.with_recursive_defaults;
        let mut defaults = if self.schema.is_leaf(lpath) {
            // {last: default} whatever the wrapping
            self.schema.defaults(lpath, recursive)
        } else {
            let unwrapped = options.get_first_key || lpath.is_root();
            let conf = if unwrapped {
                Cow::Borrowed(data)
            } else {
                match lpath.last().and_then(|last| data.get(last)) {
                    Some(Value::Object(inner)) => Cow::Borrowed(inner),
                    _ => Cow::Owned(Map::new()),
                }
            };
            let relative = relative_defaults(self.schema, lpath, &conf, recursive);
            match lpath.last() {
                Some(last) if !unwrapped && !relative.is_empty() => {
                    let mut wrapped = Map::new();
                    wrapped.insert(last.to_string(), Value::Object(relative));
                    wrapped
                }
                _ => relative,
            }
        };
        if options.no_multi_convert {
            collapse_single_lists(&mut defaults);
        }
        self.mangle(defaults, lpath, options)
    }

    fn mangle(&self, data: Map<String, Value>, lpath: &ConfigPath, options: &DictOptions) -> Map<String, Value> {
        let Some(mangling) = &options.key_mangling else {
            return data;
        };
        let base = if options.get_first_key || lpath.is_root() {
            lpath.clone()
        } else {
            lpath.parent().unwrap_or_default()
        };
        let force = options.no_tag_node_value_mangle;
        let preserve = |path: &ConfigPath| {
            self.schema.mangle_hint(path).preserve_tag_values
                || (force && self.tree.is_tag_value(path))
        };
        mangling.apply_to_map(data, &base, &preserve)
    }

    fn pki_dict(&self) -> Result<Option<Map<String, Value>>, ViewError> {
        let options = DictOptions::at(ConfigPath::from_words("pki"))
            .get_first_key()
            .key_mangling(KeyMangling::new("-", "_")?)
            .no_tag_node_value_mangle();
        let data = self.base_data(&options.path, &options)?;
        if data.is_empty() {
            return Ok(None);
        }
        let mut data = self.mangle(data, &options.path, &options);
        if let (Some(rewriter), Some(Value::Object(certificates))) =
            (self.pki, data.get_mut("certificate"))
        {
            for (name, entry) in certificates.iter_mut() {
                if let Value::Object(entry) = entry
                    && entry.contains_key("acme")
                {
                    let taken = std::mem::take(entry);
                    *entry = rewriter.rewrite_acme(name, taken);
                }
            }
        }
        Ok(Some(data))
    }
}

/// Extracts the subtree at `lpath`.
///
/// Without `get_first_key` the result wraps the content as `{last: content}`;
/// a missing path yields an empty map either way.
pub fn sub_dict(
    root: &Map<String, Value>,
    lpath: &ConfigPath,
    get_first_key: bool,
) -> Result<Map<String, Value>, ViewError> {
    let Some(last) = lpath.last() else {
        return Ok(root.clone());
    };
    let mut current = root;
    for token in lpath.truncated(lpath.len() - 1).iter() {
        match current.get(token) {
            Some(Value::Object(next)) => current = next,
            _ => return Ok(Map::new()),
        }
    }
    match (current.get(last), get_first_key) {
        (None, _) => Ok(Map::new()),
        (Some(Value::Object(inner)), true) => Ok(inner.clone()),
        (Some(_), true) => Err(ViewError::SchemaMismatch {
            path: lpath.clone(),
            reason: "data under node is not a mapping".to_string(),
        }),
        (Some(value), false) => {
            let mut wrapped = Map::new();
            wrapped.insert(last.to_string(), value.clone());
            Ok(wrapped)
        }
    }
}

fn collapse_single_lists(data: &mut Map<String, Value>) {
    for value in data.values_mut() {
        match value {
            Value::Array(items) if items.len() == 1 => {
                let single = items.remove(0);
                *value = single;
            }
            Value::Object(inner) => collapse_single_lists(inner),
            _ => {}
        }
    }
}
