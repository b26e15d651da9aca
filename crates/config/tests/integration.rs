//! Integration tests for config

#[cfg(test)]
mod tests {
    use hotswap_config::*;
    use hotswap_types::ServiceAccount;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 5] = [
        "HOTSWAP_SERVICE_NAME",
        "HOTSWAP_CHECK_PERIOD",
        "HOTSWAP_OVERLAPPING",
        "HOTSWAP_FEED_DIR",
        "HOTSWAP_LOG_DIR",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[service]
name = "agent"
display_name = "Fleet Agent"
stop_timeout_secs = 10
run_as = "svc-agent"
exec = ["/usr/bin/agent-worker", "--serve"]

[update]
check_period_secs = 60
overlapping = true
feed_dir = "/srv/feed"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.service.name, "agent");
        assert_eq!(config.service.display_name, "Fleet Agent");
        assert_eq!(
            config.service.run_as,
            ServiceAccount::User("svc-agent".to_string())
        );
        assert_eq!(config.service.exec.len(), 2);
        assert!(config.update.overlapping);
        assert_eq!(config.check_period(), Duration::from_secs(60));
        assert_eq!(config.update.feed_dir, PathBuf::from("/srv/feed"));
        // untouched sections keep defaults
        assert!(config.platform.use_sudo);
        assert_eq!(config.update.executable_name, "hotswap");
    }

    #[tokio::test]
    async fn test_invalid_toml_is_a_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[service\nname = ").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.name, "hotswap");
        assert_eq!(config.service.stop_timeout_secs, 30);
        assert_eq!(config.update.check_period_secs, 30);
        assert!(!config.update.overlapping);
        assert_eq!(config.service.run_as, ServiceAccount::LocalSystem);
        config.validate().unwrap();
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("HOTSWAP_SERVICE_NAME", "agent");
        std::env::set_var("HOTSWAP_CHECK_PERIOD", "5");
        std::env::set_var("HOTSWAP_OVERLAPPING", "yes");
        std::env::set_var("HOTSWAP_LOG_DIR", "/tmp/hotswap-logs");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.service.name, "agent");
        assert_eq!(config.update.check_period_secs, 5);
        assert!(config.update.overlapping);
        assert_eq!(config.logging.directory, PathBuf::from("/tmp/hotswap-logs"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("HOTSWAP_OVERLAPPING", "sometimes");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());
        clear_env();

        std::env::set_var("HOTSWAP_CHECK_PERIOD", "soon");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());
        clear_env();
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.update.check_period_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.name = "-agent".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.service.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identity_and_launch_derivation() {
        let mut config = Config::default();
        config.service.name = "agent".to_string();
        config.service.display_name = "Agent".to_string();
        config.update.install_root = PathBuf::from("/opt/agent");

        let identity = config.service_identity().unwrap();
        assert_eq!(identity.name(), "agent");
        assert_eq!(identity.stop_timeout(), Duration::from_secs(30));
        assert_eq!(identity.instance_name(), None);

        let launch = config.launch_spec("1.2.0");
        assert_eq!(
            launch.program,
            PathBuf::from("/opt/agent/app-1.2.0/hotswap")
        );
        assert_eq!(launch.args, vec!["run", "--unattended"]);
    }
}
