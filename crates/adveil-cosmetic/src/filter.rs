//! Cosmetic Filter
//!
//! Injects hide-rules into page contexts through a host-provided seam.
//! The host owns the rendering contexts; we only hand it style/script text.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Hide-rule payloads, compiled into the binary.
const HIDE_RULES_CSS: &str = include_str!("../resources/hide_rules.css");
const GUARD_JS: &str = include_str!("../resources/guard.js");

/// Injection failure reported by the host context.
/// Soft: callers receive `success: false`, never an error.
#[derive(Debug, Error)]
pub enum InjectionFailure {
    #[error("Context destroyed")]
    ContextDestroyed,

    #[error("Context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Script rejected: {0}")]
    ScriptRejected(String),
}

/// A rendering context the host exposes for injection.
///
/// `context_id` must be stable for the lifetime of the underlying page;
/// the host reports a fresh id after a reload.
pub trait InjectionContext {
    /// Stable identifier for this context.
    fn context_id(&self) -> &str;

    /// Apply style text to the page.
    fn inject_css(&self, css: &str) -> Result<(), InjectionFailure>;

    /// Run script text in the page.
    fn inject_js(&self, js: &str) -> Result<(), InjectionFailure>;
}

/// Outcome of one injection attempt. Ephemeral, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmeticInjectionResult {
    pub success: bool,
}

/// Injects hide-rules into page contexts, at most once per context.
pub struct CosmeticFilter {
    enabled: AtomicBool,
    injected: Mutex<HashSet<String>>,
}

impl CosmeticFilter {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            injected: Mutex::new(HashSet::new()),
        }
    }

    /// Inject hide-rules into a context.
    ///
    /// Idempotent per context id: a context that already received the
    /// rules reports success without re-injecting. Failures degrade to
    /// `success: false`; this never panics and never propagates.
    pub fn inject_into_context(&self, context: &dyn InjectionContext) -> CosmeticInjectionResult {
        if !self.enabled.load(Ordering::Relaxed) {
            return CosmeticInjectionResult { success: false };
        }

        let id = context.context_id().to_string();
        {
            let injected = self.injected.lock().unwrap_or_else(|e| e.into_inner());
            if injected.contains(&id) {
                debug!("Context {} already has hide-rules", id);
                return CosmeticInjectionResult { success: true };
            }
        }

        if let Err(e) = context.inject_css(HIDE_RULES_CSS) {
            warn!("CSS injection failed for context {}: {}", id, e);
            return CosmeticInjectionResult { success: false };
        }
        if let Err(e) = context.inject_js(GUARD_JS) {
            warn!("Script injection failed for context {}: {}", id, e);
            return CosmeticInjectionResult { success: false };
        }

        self.injected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
        CosmeticInjectionResult { success: true }
    }

    /// Forget a context so a later injection attempt runs again.
    /// The host calls this when a page is reloaded or destroyed.
    pub fn forget_context(&self, context_id: &str) {
        self.injected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(context_id);
    }

    /// Allow future injection attempts.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Stop future injection attempts. Rules already injected stay in
    /// place until the host reloads the context.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for CosmeticFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Context fake that counts injections and can be told to fail.
    struct FakeContext {
        id: String,
        fail: bool,
        css_calls: AtomicUsize,
        js_calls: AtomicUsize,
    }

    impl FakeContext {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                fail: false,
                css_calls: AtomicUsize::new(0),
                js_calls: AtomicUsize::new(0),
            }
        }

        fn failing(id: &str) -> Self {
            Self {
                fail: true,
                ..Self::new(id)
            }
        }
    }

    impl InjectionContext for FakeContext {
        fn context_id(&self) -> &str {
            &self.id
        }

        fn inject_css(&self, _css: &str) -> Result<(), InjectionFailure> {
            self.css_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InjectionFailure::ContextDestroyed);
            }
            Ok(())
        }

        fn inject_js(&self, _js: &str) -> Result<(), InjectionFailure> {
            self.js_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InjectionFailure::ContextDestroyed);
            }
            Ok(())
        }
    }

    #[test]
    fn test_injects_css_and_js() {
        let filter = CosmeticFilter::new();
        let ctx = FakeContext::new("main");

        let result = filter.inject_into_context(&ctx);
        assert!(result.success);
        assert_eq!(ctx.css_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.js_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_idempotent_per_context() {
        let filter = CosmeticFilter::new();
        let ctx = FakeContext::new("main");

        assert!(filter.inject_into_context(&ctx).success);
        assert!(filter.inject_into_context(&ctx).success);
        assert_eq!(ctx.css_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_contexts_each_injected() {
        let filter = CosmeticFilter::new();
        let a = FakeContext::new("a");
        let b = FakeContext::new("b");

        assert!(filter.inject_into_context(&a).success);
        assert!(filter.inject_into_context(&b).success);
        assert_eq!(b.css_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_degrades_softly() {
        let filter = CosmeticFilter::new();
        let ctx = FakeContext::failing("broken");

        let result = filter.inject_into_context(&ctx);
        assert!(!result.success);

        // A failed context is not marked injected; a recovered context
        // gets another attempt.
        let recovered = FakeContext::new("broken");
        assert!(filter.inject_into_context(&recovered).success);
    }

    #[test]
    fn test_disabled_skips_injection() {
        let filter = CosmeticFilter::new();
        filter.disable();
        assert!(!filter.is_active());

        let ctx = FakeContext::new("main");
        let result = filter.inject_into_context(&ctx);
        assert!(!result.success);
        assert_eq!(ctx.css_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_forget_context_allows_reinjection() {
        let filter = CosmeticFilter::new();
        let ctx = FakeContext::new("main");

        assert!(filter.inject_into_context(&ctx).success);
        filter.forget_context("main");
        assert!(filter.inject_into_context(&ctx).success);
        assert_eq!(ctx.css_calls.load(Ordering::SeqCst), 2);
    }
}
