//! Hierarchy resolution properties
//!
//! Effective levels follow the longest configured ancestor, appender sets
//! honor `include_parent_appenders`, and logger handles pick up new levels
//! after reconfiguration.

use hotlog::core::resolver::LevelResolver;
use hotlog::prelude::*;

struct NullAppender(&'static str);

impl Appender for NullAppender {
    fn name(&self) -> &str {
        self.0
    }

    fn write(&mut self, _message: &LoggedMessage<'_>) -> Result<()> {
        Ok(())
    }
}

fn base_config() -> LogConfig {
    LogConfig::new()
        .with_appender(AppenderDefinition::new("console", NullAppender("console")))
        .with_appender(AppenderDefinition::new("file", NullAppender("file")))
        .with_appender(AppenderDefinition::new("net", NullAppender("net")))
        .with_root_level(LogLevel::Info)
        .with_root_appender("console")
}

fn names(resolver: &LevelResolver, logger: &str) -> Vec<String> {
    let node = resolver.resolve(logger);
    let mut names: Vec<String> = node
        .appenders()
        .iter()
        .map(|guard| guard.name().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn effective_level_is_longest_matching_ancestor() {
    let resolver = LevelResolver::new(
        base_config()
            .with_logger(LoggerDefinition::new("App").with_level(LogLevel::Warn))
            .with_logger(LoggerDefinition::new("App.Db").with_level(LogLevel::Trace))
            .with_logger(LoggerDefinition::new("App.Db.Pool").with_level(LogLevel::Error)),
    )
    .unwrap();

    // Exact matches.
    assert_eq!(resolver.resolve("App").level(), LogLevel::Warn);
    assert_eq!(resolver.resolve("App.Db").level(), LogLevel::Trace);
    assert_eq!(resolver.resolve("App.Db.Pool").level(), LogLevel::Error);
    // Descendants inherit the deepest configured ancestor.
    assert_eq!(resolver.resolve("App.Db.Pool.Conn").level(), LogLevel::Error);
    assert_eq!(resolver.resolve("App.Db.Cache").level(), LogLevel::Trace);
    assert_eq!(resolver.resolve("App.Ui").level(), LogLevel::Warn);
    // Unrelated names fall back to the root.
    assert_eq!(resolver.resolve("Tools").level(), LogLevel::Info);
    assert_eq!(resolver.resolve("").level(), LogLevel::Info);
}

#[test]
fn include_parent_appenders_unions_the_sets() {
    let resolver = LevelResolver::new(
        base_config()
            .with_logger(
                LoggerDefinition::new("App")
                    .with_appender("file")
                    .with_include_parent_appenders(true),
            )
            .with_logger(
                LoggerDefinition::new("App.Net")
                    .with_appender("net")
                    .with_include_parent_appenders(true),
            ),
    )
    .unwrap();

    assert_eq!(names(&resolver, "App"), vec!["console", "file"]);
    // Unions accumulate down the hierarchy.
    assert_eq!(names(&resolver, "App.Net"), vec!["console", "file", "net"]);
    assert_eq!(names(&resolver, "App.Net.Socket"), vec!["console", "file", "net"]);
}

#[test]
fn exclude_parent_appenders_replaces_the_set() {
    let resolver = LevelResolver::new(
        base_config().with_logger(
            LoggerDefinition::new("App.Quiet")
                .with_appender("file")
                .with_include_parent_appenders(false),
        ),
    )
    .unwrap();

    assert_eq!(names(&resolver, "App.Quiet"), vec!["file"]);
    assert_eq!(names(&resolver, "App.Quiet.Sub"), vec!["file"]);
    // The parent subtree is untouched.
    assert_eq!(names(&resolver, "App"), vec!["console"]);
}

#[test]
fn duplicate_appender_reference_is_stored_once() {
    let resolver = LevelResolver::new(
        base_config().with_logger(
            LoggerDefinition::new("App")
                .with_appender("console")
                .with_include_parent_appenders(true),
        ),
    )
    .unwrap();

    // "console" came from both the definition and the parent.
    assert_eq!(names(&resolver, "App"), vec!["console"]);
}

#[test]
fn strategy_inherits_until_overridden() {
    let resolver = LevelResolver::new(
        base_config()
            .with_root_exhaustion_strategy(PoolExhaustionStrategy::Drop)
            .with_logger(
                LoggerDefinition::new("App.Audit")
                    .with_exhaustion_strategy(PoolExhaustionStrategy::WaitUntilAvailable),
            ),
    )
    .unwrap();

    assert_eq!(resolver.resolve("App").strategy(), PoolExhaustionStrategy::Drop);
    assert_eq!(
        resolver.resolve("App.Audit").strategy(),
        PoolExhaustionStrategy::WaitUntilAvailable
    );
    assert_eq!(
        resolver.resolve("App.Audit.Trail").strategy(),
        PoolExhaustionStrategy::WaitUntilAvailable
    );
}

#[test]
fn unknown_appender_reference_fails_at_build() {
    let result = LevelResolver::new(
        base_config().with_logger(LoggerDefinition::new("App").with_appender("nonexistent")),
    );
    assert!(matches!(
        result.unwrap_err(),
        LoggerError::UnknownAppender { .. }
    ));
}

#[test]
fn handles_refresh_cached_level_after_reconfigure() {
    let manager = LogManager::initialize(
        LogConfig::new()
            .with_appender(AppenderDefinition::new("console", NullAppender("console")))
            .with_root_appender("console")
            .with_root_level(LogLevel::Info),
    )
    .unwrap();

    let logger = manager.get_logger("App.Db");
    assert!(logger.is_enabled(LogLevel::Info));
    assert!(!logger.is_enabled(LogLevel::Debug));

    manager
        .reconfigure(
            LogConfig::new()
                .with_appender(AppenderDefinition::new("console", NullAppender("console")))
                .with_root_appender("console")
                .with_root_level(LogLevel::Info)
                .with_logger(LoggerDefinition::new("App.Db").with_level(LogLevel::Trace)),
        )
        .unwrap();

    // The cached level was refreshed by the update notification.
    assert!(logger.is_enabled(LogLevel::Debug));
    assert!(logger.is_enabled(LogLevel::Trace));

    manager
        .reconfigure(
            LogConfig::new()
                .with_appender(AppenderDefinition::new("console", NullAppender("console")))
                .with_root_appender("console")
                .with_root_level(LogLevel::Error),
        )
        .unwrap();

    assert!(!logger.is_enabled(LogLevel::Info));
    assert!(logger.is_enabled(LogLevel::Error));

    manager.shutdown();
}

#[test]
fn off_level_disables_a_subtree() {
    let resolver = LevelResolver::new(
        base_config().with_logger(LoggerDefinition::new("Noisy").with_level(LogLevel::Off)),
    )
    .unwrap();

    assert_eq!(resolver.resolve("Noisy.Sub").level(), LogLevel::Off);
    assert!(!LogLevel::Fatal.passes(resolver.resolve("Noisy.Sub").level()));
}
