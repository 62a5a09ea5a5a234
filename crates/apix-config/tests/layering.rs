//! Layered loading: TOML files below environment variables.

use apix_config::ApixConfig;
use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn project_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_dir(".apix")?;
        jail.create_file(
            ".apix/config.toml",
            r#"
[builder]
implicit_scope = "Tk"
include_paths = ["/usr/include/tk"]
api_version = "6.2"

[log]
level = "debug"
"#,
        )?;

        let config = ApixConfig::load().expect("config loads");
        assert_eq!(config.builder.implicit_scope, "Tk");
        assert_eq!(config.builder.include_paths, vec!["/usr/include/tk".to_string()]);
        assert_eq!(config.builder.flags_template, "QFlags");
        assert_eq!(config.log.level, "debug");
        Ok(())
    });
}

#[test]
fn env_beats_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".apix")?;
        jail.create_file(".apix/config.toml", "[builder]\nhash_function = \"tkHash\"\n")?;
        jail.set_env("APIX_BUILDER__HASH_FUNCTION", "envHash");

        let config = ApixConfig::load().expect("config loads");
        assert_eq!(config.builder.hash_function, "envHash");
        Ok(())
    });
}

#[test]
fn explicit_file_is_merged() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "[builder]\nconcrete_wrapper_suffix = \"Impl\"\n")?;

        let config = ApixConfig::load_from(std::path::Path::new("custom.toml"))
            .expect("config loads");
        assert_eq!(config.builder.concrete_wrapper_suffix, "Impl");
        Ok(())
    });
}

#[test]
fn partial_sections_keep_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[log]\nlevel = \"trace\"\n")?;

        let config: ApixConfig = Figment::from(Serialized::defaults(ApixConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;
        assert_eq!(config.log.level, "trace");
        assert_eq!(config.builder.interface_suffix, "Interface");
        Ok(())
    });
}
