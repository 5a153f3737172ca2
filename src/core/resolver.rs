//! Hierarchical logger configuration resolver
//!
//! A trie over the dot-separated segments of logger names. Each node carries
//! the effective (level, appender set, pool-exhaustion strategy) for its
//! subtree; lookup follows the longest matching prefix and the root carries
//! the defaults. The tree is immutable once built; reconfiguration builds a
//! new tree and swaps the root pointer, so worker-side lookups only ever pay
//! a read lock and an `Arc` clone.
//!
//! Logger handles cache their effective level. They register here as weak
//! subscribers and are refreshed after every swap instead of re-resolving on
//! each call.

use super::config::{LogConfig, LoggerDefinition, PoolExhaustionStrategy};
use super::error::Result;
use super::guard::GuardedAppender;
use super::log_level::LogLevel;
use super::logger::LoggerState;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// One trie node, frozen after build.
#[derive(Debug)]
pub struct ResolverNode {
    level: LogLevel,
    strategy: PoolExhaustionStrategy,
    appenders: Vec<Arc<GuardedAppender>>,
    children: HashMap<Box<str>, Arc<ResolverNode>>,
}

impl ResolverNode {
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn strategy(&self) -> PoolExhaustionStrategy {
        self.strategy
    }

    pub fn appenders(&self) -> &[Arc<GuardedAppender>] {
        &self.appenders
    }
}

/// Mutable form used only while building.
struct BuildNode {
    level: LogLevel,
    strategy: PoolExhaustionStrategy,
    appenders: Vec<Arc<GuardedAppender>>,
    children: HashMap<String, BuildNode>,
}

impl BuildNode {
    fn child_of(parent: &BuildNode) -> BuildNode {
        BuildNode {
            level: parent.level,
            strategy: parent.strategy,
            appenders: parent.appenders.clone(),
            children: HashMap::new(),
        }
    }

    fn freeze(self) -> Arc<ResolverNode> {
        Arc::new(ResolverNode {
            level: self.level,
            strategy: self.strategy,
            appenders: self.appenders,
            children: self
                .children
                .into_iter()
                .map(|(segment, child)| (segment.into_boxed_str(), child.freeze()))
                .collect(),
        })
    }
}

fn apply_definition(root: &mut BuildNode, definition: &LoggerDefinition, guards: &HashMap<String, Arc<GuardedAppender>>) {
    let mut node = root;
    for segment in definition.name.split('.') {
        if !node.children.contains_key(segment) {
            let child = BuildNode::child_of(node);
            node.children.insert(segment.to_string(), child);
        }
        node = node.children.get_mut(segment).expect("just inserted");
    }

    if let Some(level) = definition.level {
        node.level = level;
    }
    if let Some(strategy) = definition.pool_exhaustion_strategy {
        node.strategy = strategy;
    }

    let defined: Vec<Arc<GuardedAppender>> = definition
        .appenders
        .iter()
        .map(|name| Arc::clone(&guards[name.as_str()]))
        .collect();
    if definition.include_parent_appenders {
        // node.appenders currently holds the inherited parent set.
        let mut merged = std::mem::take(&mut node.appenders);
        for guard in defined {
            if !merged.iter().any(|existing| Arc::ptr_eq(existing, &guard)) {
                merged.push(guard);
            }
        }
        node.appenders = merged;
    } else {
        node.appenders = defined;
    }
}

fn build_tree(config: LogConfig) -> (Arc<ResolverNode>, Vec<Arc<GuardedAppender>>) {
    let quarantine_delay = config.settings.appender_quarantine_delay;
    let encoding = config.settings.encoding;

    // One shared guard per configured appender; loggers referencing the same
    // appender share its quarantine state.
    let mut guards: HashMap<String, Arc<GuardedAppender>> = HashMap::new();
    let mut all = Vec::new();
    for definition in config.appenders {
        let guard = Arc::new(GuardedAppender::new(definition, quarantine_delay));
        guard.set_encoding(encoding);
        guards.insert(guard.name().to_string(), Arc::clone(&guard));
        all.push(guard);
    }

    let root_definition = config.root.definition();
    let mut root = BuildNode {
        level: root_definition.level.unwrap_or(LogLevel::Info),
        strategy: root_definition
            .pool_exhaustion_strategy
            .unwrap_or_default(),
        appenders: root_definition
            .appenders
            .iter()
            .map(|name| Arc::clone(&guards[name.as_str()]))
            .collect(),
        children: HashMap::new(),
    };

    // Parents before children so intermediate nodes inherit settled values.
    let mut definitions = config.loggers;
    definitions.sort_by(|a, b| a.name.cmp(&b.name));
    for definition in &definitions {
        apply_definition(&mut root, definition, &guards);
    }

    (root.freeze(), all)
}

#[derive(Debug)]
pub struct LevelResolver {
    root: RwLock<Arc<ResolverNode>>,
    /// Every guard of the current tree, for worker-wide flush and close.
    appenders: RwLock<Vec<Arc<GuardedAppender>>>,
    version: AtomicU64,
    subscribers: Mutex<Vec<Weak<LoggerState>>>,
}

impl LevelResolver {
    /// Build the initial tree. The config must already be validated.
    pub fn new(config: LogConfig) -> Result<Self> {
        config.validate()?;
        let (root, appenders) = build_tree(config);
        Ok(Self {
            root: RwLock::new(root),
            appenders: RwLock::new(appenders),
            version: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Effective configuration for a dotted logger name: the last trie node
    /// on the longest matching prefix. The empty name resolves to the root.
    pub fn resolve(&self, name: &str) -> Arc<ResolverNode> {
        let mut node = Arc::clone(&self.root.read());
        if name.is_empty() {
            return node;
        }
        for segment in name.split('.') {
            let next = match node.children.get(segment) {
                Some(child) => Arc::clone(child),
                None => break,
            };
            node = next;
        }
        node
    }

    /// Replace the tree. Appenders reachable only from the old tree are
    /// closed after the swap; shared instances carry their quarantine state
    /// over untouched. Subscribed logger handles are refreshed.
    pub fn rebuild(&self, config: LogConfig) -> Result<()> {
        config.validate()?;
        let (new_root, new_appenders) = build_tree(config);

        let old_appenders = {
            let mut root = self.root.write();
            let mut appenders = self.appenders.write();
            *root = new_root;
            std::mem::replace(&mut *appenders, new_appenders)
        };

        let current = self.appenders.read();
        for old in &old_appenders {
            let survives = current.iter().any(|new| Arc::ptr_eq(new, old));
            if !survives {
                old.close();
            }
        }
        drop(current);

        self.version.fetch_add(1, Ordering::Release);
        self.notify_subscribers();
        Ok(())
    }

    /// All guards of the current tree (flush cadence, shutdown close).
    pub fn all_appenders(&self) -> Vec<Arc<GuardedAppender>> {
        self.appenders.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Register a logger handle for refresh after reconfiguration.
    pub fn subscribe(&self, state: Weak<LoggerState>) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|weak| weak.strong_count() > 0);
        subscribers.push(state);
    }

    fn notify_subscribers(&self) {
        let subscribers: Vec<Weak<LoggerState>> = {
            let mut guard = self.subscribers.lock();
            guard.retain(|weak| weak.strong_count() > 0);
            guard.clone()
        };
        for weak in subscribers {
            if let Some(state) = weak.upgrade() {
                state.refresh(self);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appender::{Appender, LoggedMessage};
    use crate::core::config::{AppenderDefinition, LoggerDefinition};

    struct NullAppender;

    impl Appender for NullAppender {
        fn name(&self) -> &str {
            "null"
        }

        fn write(&mut self, _message: &LoggedMessage<'_>) -> crate::core::error::Result<()> {
            Ok(())
        }
    }

    fn config() -> LogConfig {
        LogConfig::new()
            .with_appender(AppenderDefinition::new("console", NullAppender))
            .with_appender(AppenderDefinition::new("file", NullAppender))
            .with_root_level(LogLevel::Info)
            .with_root_appender("console")
    }

    fn appender_names(node: &ResolverNode) -> Vec<String> {
        let mut names: Vec<String> = node
            .appenders()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_root_defaults_apply_to_unknown_names() {
        let resolver = LevelResolver::new(config()).unwrap();
        let node = resolver.resolve("Never.Configured.Name");
        assert_eq!(node.level(), LogLevel::Info);
        assert_eq!(appender_names(&node), vec!["console"]);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let resolver = LevelResolver::new(
            config()
                .with_logger(LoggerDefinition::new("App").with_level(LogLevel::Warn))
                .with_logger(LoggerDefinition::new("App.Db").with_level(LogLevel::Trace)),
        )
        .unwrap();

        assert_eq!(resolver.resolve("App").level(), LogLevel::Warn);
        assert_eq!(resolver.resolve("App.Net").level(), LogLevel::Warn);
        assert_eq!(resolver.resolve("App.Db").level(), LogLevel::Trace);
        assert_eq!(resolver.resolve("App.Db.Pool").level(), LogLevel::Trace);
        assert_eq!(resolver.resolve("Other").level(), LogLevel::Info);
    }

    #[test]
    fn test_parent_appender_union() {
        let resolver = LevelResolver::new(
            config().with_logger(
                LoggerDefinition::new("App")
                    .with_appender("file")
                    .with_include_parent_appenders(true),
            ),
        )
        .unwrap();

        let node = resolver.resolve("App");
        assert_eq!(appender_names(&node), vec!["console", "file"]);
    }

    #[test]
    fn test_parent_appenders_excluded() {
        let resolver = LevelResolver::new(
            config().with_logger(
                LoggerDefinition::new("App")
                    .with_appender("file")
                    .with_include_parent_appenders(false),
            ),
        )
        .unwrap();

        let node = resolver.resolve("App");
        assert_eq!(appender_names(&node), vec!["file"]);
        // Sibling subtrees keep the root set.
        assert_eq!(appender_names(&resolver.resolve("Other")), vec!["console"]);
    }

    #[test]
    fn test_shared_appender_instance() {
        let resolver = LevelResolver::new(
            config()
                .with_logger(LoggerDefinition::new("A").with_appender("file"))
                .with_logger(LoggerDefinition::new("B").with_appender("file")),
        )
        .unwrap();

        let a = resolver.resolve("A");
        let b = resolver.resolve("B");
        let file_a = a.appenders().iter().find(|g| g.name() == "file").unwrap();
        let file_b = b.appenders().iter().find(|g| g.name() == "file").unwrap();
        assert!(Arc::ptr_eq(file_a, file_b));
    }

    #[test]
    fn test_strategy_inheritance() {
        let resolver = LevelResolver::new(
            config()
                .with_root_exhaustion_strategy(PoolExhaustionStrategy::Drop)
                .with_logger(
                    LoggerDefinition::new("App.Critical")
                        .with_exhaustion_strategy(PoolExhaustionStrategy::WaitUntilAvailable),
                ),
        )
        .unwrap();

        assert_eq!(
            resolver.resolve("App").strategy(),
            PoolExhaustionStrategy::Drop
        );
        assert_eq!(
            resolver.resolve("App.Critical").strategy(),
            PoolExhaustionStrategy::WaitUntilAvailable
        );
        assert_eq!(
            resolver.resolve("App.Critical.Sub").strategy(),
            PoolExhaustionStrategy::WaitUntilAvailable
        );
    }

    #[test]
    fn test_rebuild_bumps_version() {
        let resolver = LevelResolver::new(config()).unwrap();
        let before = resolver.version();
        resolver
            .rebuild(config().with_logger(LoggerDefinition::new("App").with_level(LogLevel::Error)))
            .unwrap();
        assert!(resolver.version() > before);
        assert_eq!(resolver.resolve("App").level(), LogLevel::Error);
    }
}
