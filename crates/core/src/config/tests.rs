use super::*;
use tempfile::NamedTempFile;

#[test]
fn test_default_config_validation() {
    let config = SynthConfig::default();
    let result = config.validate();
    assert!(result.is_ok(), "Default configuration should be valid: {:?}", result);

    assert_eq!(config.compiler.evm_version, "shanghai");
    assert!(config.compiler.optimizer_enabled);
    assert_eq!(config.compiler.optimizer_runs, 200);
    assert_eq!(config.compiler.contract_selection, ContractSelection::LastDefined);
    assert!(!config.assistant.is_configured());
}

#[test]
fn test_compiler_settings_validation() {
    let settings = CompilerSettings {
        evm_version: "frontier-2".to_string(),
        optimizer_runs: 0,
        ..Default::default()
    };
    let errors = settings.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].field, "compiler.evm_version");
    assert_eq!(errors[1].field, "compiler.optimizer_runs");

    // Zero runs are fine with the optimizer off
    let settings = CompilerSettings {
        optimizer_enabled: false,
        optimizer_runs: 0,
        ..Default::default()
    };
    assert!(settings.validate().is_ok());

    let settings = CompilerSettings {
        library_root: Some(PathBuf::from("/definitely/not/a/real/dir")),
        ..Default::default()
    };
    assert!(settings.validate().is_err());
}

#[test]
fn test_assistant_config_validation() {
    let config = AssistantConfig {
        endpoint: "ftp://models".to_string(),
        temperature: 3.5,
        ..Default::default()
    };
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);

    let config = AssistantConfig {
        api_key: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(!config.is_configured());

    let config = AssistantConfig {
        api_key: Some("sk-test".to_string()),
        ..Default::default()
    };
    assert!(config.is_configured());

    let config = AssistantConfig {
        generation_max_tokens: 0,
        ..Default::default()
    };
    let errors = config.validate().unwrap_err();
    assert_eq!(errors[0].field, "assistant.generation_max_tokens");
}

#[test]
fn test_api_and_logging_validation() {
    let config = ApiConfig {
        port: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = LogConfig {
        level: "verbose".to_string(),
        format: "xml".to_string(),
    };
    assert_eq!(config.validate().unwrap_err().len(), 2);
}

#[test]
fn test_nested_errors_are_collected() {
    let mut config = SynthConfig::default();
    config.api.host = String::new();
    config.logging.format = "xml".to_string();

    let errors = config.validate().unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["api.host", "logging.format"]);
    assert_eq!(
        errors[0].to_string(),
        "Validation error in field 'api.host': Host cannot be empty"
    );
}

#[test]
fn test_environment_overrides() {
    std::env::set_var("SYNTH_API_PORT", "9191");
    std::env::set_var("SYNTH_LOG_LEVEL", "debug");
    std::env::set_var("SYNTH_ENVIRONMENT", "production");

    let manager = ConfigManager::new().unwrap();

    assert_eq!(manager.config().api.port, 9191);
    assert_eq!(manager.config().logging.level, "debug");
    assert_eq!(manager.config().environment, Environment::Production);

    std::env::remove_var("SYNTH_API_PORT");
    std::env::remove_var("SYNTH_LOG_LEVEL");
    std::env::remove_var("SYNTH_ENVIRONMENT");
}

#[test]
fn test_config_file_operations() {
    let mut config = SynthConfig::default();
    config.compiler.optimizer_runs = 1000;
    config.compiler.contract_selection = ContractSelection::Strict;

    let temp_file = NamedTempFile::new().unwrap();

    for extension in ["toml", "json"] {
        let path = temp_file.path().with_extension(extension);
        let manager = ConfigManager {
            config: config.clone(),
            config_path: None,
        };

        manager.save_to_file(&path).unwrap();
        let loaded = ConfigManager::load_from_file(&path).unwrap();

        assert_eq!(loaded.config().compiler.optimizer_runs, 1000);
        assert_eq!(loaded.config().compiler.contract_selection, ContractSelection::Strict);
        assert_eq!(loaded.config_path(), Some(path.as_path()));
    }
}

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("synth.toml");
    std::fs::write(&path, "[compiler]\noptimizer_runs = 50\n").unwrap();

    let loaded = ConfigManager::load_from_file(&path).unwrap();
    assert_eq!(loaded.config().compiler.optimizer_runs, 50);
    assert_eq!(loaded.config().compiler.evm_version, "shanghai");
    assert_eq!(loaded.config().assistant.max_tokens, 500);
}

#[test]
fn test_unsupported_extension_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("synth.ini");
    std::fs::write(&path, "x = 1").unwrap();

    assert!(matches!(ConfigManager::load_from_file(&path), Err(Error::Config(_))));
}

#[test]
fn test_environment_specific_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("synth.production.toml");

    ConfigManager::generate_default_config(&path, Environment::Production).unwrap();
    let loaded = ConfigManager::load_from_file(&path).unwrap();

    assert_eq!(loaded.config().logging.format, "json");
}

#[test]
fn test_environment_parses_names() {
    assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
    assert_eq!("Test".parse::<Environment>().unwrap(), Environment::Test);
    assert!(matches!("qa".parse::<Environment>(), Err(Error::Config(_))));
}

#[test]
fn test_library_root_falls_back_to_node_modules() {
    let dir = tempfile::tempdir().unwrap();
    let settings = CompilerSettings::default();
    assert_eq!(settings.library_root_in(dir.path()), None);

    let node_modules = dir.path().join("node_modules");
    fs::create_dir(&node_modules).unwrap();
    assert_eq!(settings.library_root_in(dir.path()), Some(node_modules));

    let explicit = CompilerSettings {
        library_root: Some(PathBuf::from("/opt/solidity-libs")),
        ..Default::default()
    };
    assert_eq!(explicit.library_root_in(dir.path()), Some(PathBuf::from("/opt/solidity-libs")));
}
