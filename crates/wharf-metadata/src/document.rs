//! Per-package metadata documents and the root index.

use serde_json::{json, Map, Value};
use wharf_store::models::{PackageRecord, VersionRecord};

use crate::{
    error::Result,
    minify::{minify, MINIFY_FORMAT},
    version_array::version_array,
};

/// File name of the root index document.
pub const ROOT_INDEX: &str = "packages.json";

/// Relative path of a package's modern (minified) document.
pub fn modern_path(name: &str) -> String {
    format!("p2/{name}.json")
}

/// Relative path of a package's legacy document, or its dev-branch variant.
pub fn legacy_path(name: &str, dev: bool) -> String {
    if dev {
        format!("p/{name}~dev.json")
    } else {
        format!("p/{name}.json")
    }
}

/// Builds the modern document: every version of the package, stable and
/// dev, in one minified map with the explicit format marker.
pub fn modern_document(
    package: &PackageRecord,
    versions: &[VersionRecord],
) -> Value {
    let arrays: Vec<Value> = versions
        .iter()
        .map(|v| version_array(package, v))
        .collect();

    let mut packages = Map::new();
    packages.insert(package.name.clone(), Value::Array(minify(&arrays)));

    json!({
        "packages": packages,
        "minified": MINIFY_FORMAT,
    })
}

/// Builds the two legacy documents: expanded maps from version string to
/// version array, stable releases in one file and dev branches in the
/// other.
pub fn legacy_documents(
    package: &PackageRecord,
    versions: &[VersionRecord],
) -> (Value, Value) {
    let mut stable = Map::new();
    let mut dev = Map::new();

    for version in versions {
        let target = if version.dev { &mut dev } else { &mut stable };
        target.insert(version.version.clone(), version_array(package, version));
    }

    let wrap = |versions: Map<String, Value>| {
        let mut packages = Map::new();
        packages.insert(package.name.clone(), Value::Object(versions));
        json!({ "packages": packages })
    };

    (wrap(stable), wrap(dev))
}

/// Builds the root index enumerating the live catalog.
///
/// The index references per-package files purely by name convention, so it
/// stays valid while individual documents are mid-flight.
pub fn root_index(names: &[String]) -> Value {
    json!({
        "packages": {},
        "metadata-url": "/p2/%package%.json",
        "changes-url": "/metadata/changes.json",
        "available-packages": names,
    })
}

/// Serializes a document into its published byte representation.
pub fn document_bytes(document: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minify::expand;

    fn package() -> PackageRecord {
        PackageRecord {
            id: 1,
            name: "acme/widget".to_string(),
            crawled_at: Some(0),
            dumped_at: None,
            dumped_at_v2: None,
            frozen: None,
            abandoned: false,
            replacement_package: None,
        }
    }

    fn version(version: &str, dev: bool) -> VersionRecord {
        VersionRecord {
            id: 0,
            package_id: 1,
            version: version.to_string(),
            normalized_version: format!("{version}.0"),
            dev,
            released_at: None,
            default_branch: false,
            description: Some("A widget".to_string()),
            keywords: None,
            homepage: None,
            license: None,
            authors: None,
            source: None,
            dist: None,
            pkg_type: None,
            support: None,
            funding: None,
            autoload: None,
            extra: None,
            target_dir: None,
            include_path: None,
            bin: None,
            require: None,
            require_dev: None,
            suggest: None,
            conflict: None,
            provide: None,
            replace: None,
        }
    }

    #[test]
    fn test_paths() {
        assert_eq!(modern_path("acme/widget"), "p2/acme/widget.json");
        assert_eq!(legacy_path("acme/widget", false), "p/acme/widget.json");
        assert_eq!(legacy_path("acme/widget", true), "p/acme/widget~dev.json");
    }

    #[test]
    fn test_modern_document_carries_format_marker() {
        let versions = vec![version("1.0.0", false), version("dev-main", true)];
        let doc = modern_document(&package(), &versions);

        assert_eq!(doc["minified"], MINIFY_FORMAT);
        let arrays = doc["packages"]["acme/widget"].as_array().unwrap();
        assert_eq!(arrays.len(), 2);

        let expanded = expand(arrays);
        assert_eq!(expanded[0]["version"], "1.0.0");
        assert_eq!(expanded[1]["version"], "dev-main");
        assert_eq!(expanded[1]["description"], "A widget");
    }

    #[test]
    fn test_legacy_documents_split_stable_and_dev() {
        let versions = vec![version("1.0.0", false), version("dev-main", true)];
        let (stable, dev) = legacy_documents(&package(), &versions);

        let stable_map = stable["packages"]["acme/widget"].as_object().unwrap();
        assert!(stable_map.contains_key("1.0.0"));
        assert!(!stable_map.contains_key("dev-main"));

        let dev_map = dev["packages"]["acme/widget"].as_object().unwrap();
        assert!(dev_map.contains_key("dev-main"));
        assert!(!dev_map.contains_key("1.0.0"));
    }

    #[test]
    fn test_root_index_lists_names_only() {
        let names = vec!["acme/widget".to_string(), "other/pkg".to_string()];
        let index = root_index(&names);

        assert_eq!(index["metadata-url"], "/p2/%package%.json");
        assert_eq!(
            index["available-packages"],
            serde_json::json!(["acme/widget", "other/pkg"])
        );
    }

    #[test]
    fn test_document_bytes_are_deterministic() {
        let versions = vec![version("1.0.0", false)];
        let a = document_bytes(&modern_document(&package(), &versions)).unwrap();
        let b = document_bytes(&modern_document(&package(), &versions)).unwrap();
        assert_eq!(a, b);
    }
}
