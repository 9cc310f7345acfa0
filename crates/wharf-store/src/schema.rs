diesel::table! {
    packages (id) {
        id -> BigInt,
        name -> Text,
        crawled_at -> Nullable<BigInt>,
        dumped_at -> Nullable<BigInt>,
        dumped_at_v2 -> Nullable<BigInt>,
        frozen -> Nullable<Text>,
        abandoned -> Bool,
        replacement_package -> Nullable<Text>,
    }
}

diesel::table! {
    versions (id) {
        id -> BigInt,
        package_id -> BigInt,
        version -> Text,
        normalized_version -> Text,
        dev -> Bool,
        released_at -> Nullable<BigInt>,
        default_branch -> Bool,
        description -> Nullable<Text>,
        keywords -> Nullable<Text>,
        homepage -> Nullable<Text>,
        license -> Nullable<Text>,
        authors -> Nullable<Text>,
        source -> Nullable<Text>,
        dist -> Nullable<Text>,
        pkg_type -> Nullable<Text>,
        support -> Nullable<Text>,
        funding -> Nullable<Text>,
        autoload -> Nullable<Text>,
        extra -> Nullable<Text>,
        target_dir -> Nullable<Text>,
        include_path -> Nullable<Text>,
        bin -> Nullable<Text>,
        require -> Nullable<Text>,
        require_dev -> Nullable<Text>,
        suggest -> Nullable<Text>,
        conflict -> Nullable<Text>,
        provide -> Nullable<Text>,
        replace -> Nullable<Text>,
    }
}

diesel::table! {
    feed_updates (package, score) {
        package -> Text,
        score -> BigInt,
    }
}

diesel::table! {
    feed_deletes (package, score) {
        package -> Text,
        score -> BigInt,
    }
}

diesel::table! {
    feed_meta (id) {
        id -> BigInt,
        oldest_retained -> BigInt,
    }
}

diesel::joinable!(versions -> packages (package_id));
diesel::allow_tables_to_appear_in_same_query!(packages, versions);
