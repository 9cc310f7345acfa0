//! Assembly of one version's wire representation.

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};
use wharf_store::models::{PackageRecord, VersionRecord};

/// Builds the ordered version-array object for one version.
///
/// Key order is part of the published document's stable byte
/// representation; fields that are absent or empty are omitted entirely.
/// The abandoned marker is inherited from the package: `true` when
/// abandoned without a successor, or the replacement package name.
pub fn version_array(package: &PackageRecord, version: &VersionRecord) -> Value {
    let mut out = Map::new();

    out.insert("name".into(), Value::String(package.name.clone()));
    insert_str(&mut out, "description", version.description.as_deref());
    insert_json(&mut out, "keywords", version.keywords.as_ref());
    insert_str(&mut out, "homepage", version.homepage.as_deref());
    out.insert("version".into(), Value::String(version.version.clone()));
    out.insert(
        "version_normalized".into(),
        Value::String(version.normalized_version.clone()),
    );
    insert_json(&mut out, "license", version.license.as_ref());
    insert_json(&mut out, "authors", version.authors.as_ref());
    insert_json(&mut out, "source", version.source.as_ref());
    insert_json(&mut out, "dist", version.dist.as_ref());
    insert_str(&mut out, "type", version.pkg_type.as_deref());
    insert_json(&mut out, "support", version.support.as_ref());
    insert_json(&mut out, "funding", version.funding.as_ref());

    if let Some(released_at) = version.released_at {
        if let Some(time) = DateTime::from_timestamp_millis(released_at) {
            out.insert(
                "time".into(),
                Value::String(time.to_rfc3339_opts(SecondsFormat::Secs, false)),
            );
        }
    }

    insert_json(&mut out, "autoload", version.autoload.as_ref());
    insert_json(&mut out, "extra", version.extra.as_ref());
    insert_str(&mut out, "target-dir", version.target_dir.as_deref());
    insert_json(&mut out, "include-path", version.include_path.as_ref());
    insert_json(&mut out, "bin", version.bin.as_ref());

    if version.default_branch {
        out.insert("default-branch".into(), Value::Bool(true));
    }

    insert_json(&mut out, "require", version.require.as_ref());
    insert_json(&mut out, "require-dev", version.require_dev.as_ref());
    insert_json(&mut out, "suggest", version.suggest.as_ref());
    insert_json(&mut out, "conflict", version.conflict.as_ref());
    insert_json(&mut out, "provide", version.provide.as_ref());
    insert_json(&mut out, "replace", version.replace.as_ref());

    if package.abandoned {
        let marker = match package.replacement_package.as_deref() {
            Some(replacement) if !replacement.is_empty() => {
                Value::String(replacement.to_string())
            }
            _ => Value::Bool(true),
        };
        out.insert("abandoned".into(), marker);
    }

    Value::Object(out)
}

fn insert_str(out: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            out.insert(key.into(), Value::String(value.to_string()));
        }
    }
}

fn insert_json(out: &mut Map<String, Value>, key: &str, value: Option<&Value>) {
    let Some(value) = value else { return };

    let empty = match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if !empty {
        out.insert(key.into(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

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

    fn release() -> VersionRecord {
        VersionRecord {
            id: 1,
            package_id: 1,
            version: "1.0.0".to_string(),
            normalized_version: "1.0.0.0".to_string(),
            dev: false,
            released_at: Some(1_577_836_800_000),
            default_branch: false,
            description: Some("A widget".to_string()),
            keywords: Some(json!(["widget"])),
            homepage: None,
            license: Some(json!(["MIT"])),
            authors: None,
            source: Some(json!({"type": "git", "url": "https://example.org/widget.git", "reference": "abc"})),
            dist: None,
            pkg_type: Some("library".to_string()),
            support: None,
            funding: None,
            autoload: Some(json!({"psr-4": {"Acme\\": "src/"}})),
            extra: None,
            target_dir: None,
            include_path: None,
            bin: None,
            require: Some(json!({"php": ">=8.1"})),
            require_dev: None,
            suggest: None,
            conflict: None,
            provide: None,
            replace: None,
        }
    }

    #[test]
    fn test_canonical_key_order() {
        let array = version_array(&package(), &release());
        let keys: Vec<_> = array.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "name",
                "description",
                "keywords",
                "version",
                "version_normalized",
                "license",
                "source",
                "type",
                "time",
                "autoload",
                "require",
            ]
        );
    }

    #[test]
    fn test_release_time_is_rfc3339() {
        let array = version_array(&package(), &release());
        assert_eq!(array["time"], json!("2020-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let mut version = release();
        version.require = Some(json!({}));
        version.keywords = Some(json!([]));
        let array = version_array(&package(), &version);
        let object = array.as_object().unwrap();
        assert!(!object.contains_key("require"));
        assert!(!object.contains_key("keywords"));
        assert!(!object.contains_key("abandoned"));
        assert!(!object.contains_key("default-branch"));
    }

    #[test]
    fn test_default_branch_marker() {
        let mut version = release();
        version.default_branch = true;
        let array = version_array(&package(), &version);
        assert_eq!(array["default-branch"], json!(true));
    }

    #[test]
    fn test_abandoned_without_replacement() {
        let mut pkg = package();
        pkg.abandoned = true;
        let array = version_array(&pkg, &release());
        assert_eq!(array["abandoned"], json!(true));
    }

    #[test]
    fn test_abandoned_with_replacement() {
        let mut pkg = package();
        pkg.abandoned = true;
        pkg.replacement_package = Some("acme/gadget".to_string());
        let array = version_array(&pkg, &release());
        assert_eq!(array["abandoned"], json!("acme/gadget"));
    }
}
