//! Integration tests: bootstrap-proxy trust verification end to end.

use std::any::Any;
use std::sync::{Arc, Mutex};

use proxy_trust::constraint::{InvocationConstraint, InvocationConstraints, MethodConstraints};
use proxy_trust::proxy::{
    BasicProxy, DynamicProxy, Interface, Method, ProxyRef, ProxyTrust,
    ProxyTrustInvocationHandler, RemoteMethodControl, RemoteObject, TrustEquivalence, Value,
};
use proxy_trust::verify::{
    verify_object_trust, BasicTrustContext, ContextItem, NamedTrustVerifier, ProxyTrustIterator,
    ProxyTrustVerifier, SequenceProxyTrustIterator, TrustContext, TrustIteratorSource,
    TrustVerifier, VisitBudget,
};
use proxy_trust::{Result, TrustConfig, TrustError};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn echo() -> Interface {
    Interface::new("Echo")
}

fn trust_interfaces() -> Vec<Interface> {
    vec![
        echo(),
        Interface::REMOTE_METHOD_CONTROL,
        Interface::TRUST_EQUIVALENCE,
    ]
}

fn main_proxy(name: &str) -> ProxyRef {
    BasicProxy::builder(name)
        .interface(echo())
        .method_control()
        .trust_equivalence()
        .build()
}

fn boot_with(name: &str, verifier: Arc<dyn TrustVerifier>) -> ProxyRef {
    BasicProxy::builder(name)
        .method_control()
        .trust_equivalence()
        .verifier(verifier)
        .build()
}

fn self_trusting_boot(name: &str) -> ProxyRef {
    boot_with(name, Arc::new(NamedTrustVerifier::new([name])))
}

fn integrity() -> MethodConstraints {
    MethodConstraints::uniform(
        InvocationConstraints::new(vec![InvocationConstraint::INTEGRITY_YES], vec![]).unwrap(),
    )
}

/// Records the name of every object it is asked about; trusts one name.
#[derive(Debug)]
struct Recording {
    trusts: String,
    seen: Mutex<Vec<String>>,
}

impl Recording {
    fn new(trusts: &str) -> Arc<Self> {
        Arc::new(Self {
            trusts: trusts.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl TrustVerifier for Recording {
    fn is_trusted_object(
        &self,
        obj: &ProxyRef,
        _ctx: &dyn TrustContext,
        _budget: &mut VisitBudget,
    ) -> Result<bool> {
        let name = obj
            .as_any()
            .downcast_ref::<BasicProxy>()
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let trusted = name == self.trusts;
        self.seen.lock().unwrap().push(name);
        Ok(trusted)
    }
}

#[derive(Debug)]
struct Denying;

impl TrustVerifier for Denying {
    fn is_trusted_object(
        &self,
        _obj: &ProxyRef,
        _ctx: &dyn TrustContext,
        _budget: &mut VisitBudget,
    ) -> Result<bool> {
        Err(TrustError::Security("access denied".into()))
    }
}

/// A smart proxy offering a fixed list of bootstrap candidates itself.
#[derive(Debug)]
struct SmartProxy {
    candidates: Vec<Result<ProxyRef>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl SmartProxy {
    fn new(candidates: Vec<ProxyRef>) -> Arc<Self> {
        Arc::new(Self {
            candidates: candidates.into_iter().map(Ok).collect(),
            failures: Arc::default(),
        })
    }
}

impl RemoteObject for SmartProxy {
    fn interfaces(&self) -> Vec<Interface> {
        vec![echo()]
    }

    fn invoke(&self, method: &Method, _args: &[Value]) -> Result<Value> {
        Err(TrustError::Unsupported(method.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn trust_iterator_source(&self) -> Option<&dyn TrustIteratorSource> {
        Some(self)
    }
}

/// Forwards to a sequence and keeps the failures it is told about.
struct ReportingIterator {
    inner: SequenceProxyTrustIterator<std::vec::IntoIter<Result<ProxyRef>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl ProxyTrustIterator for ReportingIterator {
    fn has_next(&mut self) -> bool {
        self.inner.has_next()
    }

    fn next(&mut self) -> Result<ProxyRef> {
        self.inner.next()
    }

    fn set_exception(&mut self, err: TrustError) {
        self.failures.lock().unwrap().push(err.to_string());
    }
}

impl TrustIteratorSource for SmartProxy {
    fn proxy_trust_iterator(&self) -> Result<Box<dyn ProxyTrustIterator>> {
        let items: Vec<Result<ProxyRef>> = self
            .candidates
            .iter()
            .map(|c| match c {
                Ok(p) => Ok(p.clone()),
                Err(e) => Err(TrustError::Remote(e.to_string())),
            })
            .collect();
        Ok(Box::new(ReportingIterator {
            inner: SequenceProxyTrustIterator::new(items),
            failures: self.failures.clone(),
        }))
    }
}

// ── Verification ──────────────────────────────────────────────────────────────

#[test]
fn trust_proxy_verified_through_bootstrap() {
    let proxy: ProxyRef = ProxyTrustInvocationHandler::create_proxy(
        trust_interfaces(),
        main_proxy("echo"),
        self_trusting_boot("echo-boot"),
    )
    .unwrap();
    let ctx = BasicTrustContext::new().with_verifier(Arc::new(ProxyTrustVerifier::new()));
    verify_object_trust(&proxy, &ctx, &TrustConfig::default()).unwrap();
}

#[test]
fn verification_is_idempotent() {
    let recording = Recording::new("boot");
    let proxy: ProxyRef = ProxyTrustInvocationHandler::create_proxy(
        trust_interfaces(),
        main_proxy("echo"),
        boot_with("boot", recording.clone()),
    )
    .unwrap();
    let verifier = ProxyTrustVerifier::new();
    let ctx = BasicTrustContext::new();

    let first = verifier.is_trusted(&proxy, &ctx).unwrap();
    let second = verifier.is_trusted(&proxy, &ctx).unwrap();
    let third = verifier.is_trusted(&proxy, &ctx).unwrap();
    assert!(first);
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(recording.seen(), vec!["boot", "boot", "boot"]);
}

#[test]
fn verification_short_circuits_on_first_success() {
    let recording = Recording::new("B");
    let smart: ProxyRef = SmartProxy::new(vec![
        boot_with("A", recording.clone()),
        boot_with("B", recording.clone()),
        boot_with("C", recording.clone()),
    ]);
    let ctx = BasicTrustContext::new();
    assert!(ProxyTrustVerifier::new().is_trusted(&smart, &ctx).unwrap());
    assert_eq!(recording.seen(), vec!["A", "B"]);
}

#[test]
fn candidates_examined_in_order_until_exhausted() {
    let recording = Recording::new("nobody");
    let smart: ProxyRef = SmartProxy::new(vec![
        boot_with("A", recording.clone()),
        boot_with("B", recording.clone()),
        boot_with("C", recording.clone()),
    ]);
    let ctx = BasicTrustContext::new();
    assert!(!ProxyTrustVerifier::new().is_trusted(&smart, &ctx).unwrap());
    assert_eq!(recording.seen(), vec!["A", "B", "C"]);
}

#[test]
fn candidates_lacking_capabilities_are_skipped() {
    let recording = Recording::new("good");
    let no_rmc: ProxyRef = BasicProxy::builder("no-rmc")
        .trust_equivalence()
        .verifier(recording.clone())
        .build();
    let no_te: ProxyRef = BasicProxy::builder("no-te")
        .method_control()
        .verifier(recording.clone())
        .build();
    let no_verifier: ProxyRef = BasicProxy::builder("no-verifier")
        .method_control()
        .trust_equivalence()
        .build();
    let smart: ProxyRef = SmartProxy::new(vec![
        no_rmc,
        no_te,
        no_verifier,
        boot_with("good", recording.clone()),
    ]);
    let ctx = BasicTrustContext::new();
    assert!(ProxyTrustVerifier::new().is_trusted(&smart, &ctx).unwrap());
    assert_eq!(recording.seen(), vec!["good"]);
}

#[test]
fn object_without_trust_source_is_not_trusted() {
    let ctx = BasicTrustContext::new().with_verifier(Arc::new(ProxyTrustVerifier::new()));
    let plain = main_proxy("plain");
    let result = verify_object_trust(&plain, &ctx, &TrustConfig::default());
    assert!(matches!(result, Err(TrustError::Untrusted(_))));
}

#[test]
fn security_error_from_verifier_propagates() {
    let proxy: ProxyRef = ProxyTrustInvocationHandler::create_proxy(
        trust_interfaces(),
        main_proxy("echo"),
        boot_with("boot", Arc::new(Denying)),
    )
    .unwrap();
    let ctx = BasicTrustContext::new();
    let result = ProxyTrustVerifier::new().is_trusted(&proxy, &ctx);
    assert!(matches!(result, Err(TrustError::Security(_))));

    // Also through a context, ahead of verifiers that would trust it.
    let ctx = BasicTrustContext::new()
        .with_verifier(Arc::new(ProxyTrustVerifier::new()))
        .with_verifier(Arc::new(NamedTrustVerifier::new(["echo"])));
    let result = verify_object_trust(&proxy, &ctx, &TrustConfig::default());
    assert!(matches!(result, Err(TrustError::Security(_))));
}

#[test]
fn security_error_aborts_remaining_candidates() {
    let recording = Recording::new("B");
    let smart: ProxyRef = SmartProxy::new(vec![
        boot_with("A", Arc::new(Denying)),
        boot_with("B", recording.clone()),
    ]);
    let ctx = BasicTrustContext::new();
    let result = ProxyTrustVerifier::new().is_trusted(&smart, &ctx);
    assert!(matches!(result, Err(TrustError::Security(_))));
    assert!(recording.seen().is_empty());
}

#[test]
fn remote_failure_reported_and_next_candidate_tried() {
    let offline: ProxyRef = BasicProxy::builder("A")
        .method_control()
        .trust_equivalence()
        .verifier(Arc::new(NamedTrustVerifier::new(["A"])))
        .offline()
        .build();
    let smart = SmartProxy::new(vec![offline, self_trusting_boot("B")]);
    let failures = smart.failures.clone();
    let smart: ProxyRef = smart;
    let ctx = BasicTrustContext::new();
    assert!(ProxyTrustVerifier::new().is_trusted(&smart, &ctx).unwrap());
    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("unreachable"));
}

#[test]
fn iteration_error_propagates() {
    let smart: ProxyRef = Arc::new(SmartProxy {
        candidates: vec![
            Err(TrustError::Remote("codebase fetch failed".into())),
            Ok(self_trusting_boot("B")),
        ],
        failures: Arc::default(),
    });
    let ctx = BasicTrustContext::new();
    let result = ProxyTrustVerifier::new().is_trusted(&smart, &ctx);
    assert!(matches!(result, Err(TrustError::Remote(_))));
}

/// Fails to produce its bootstrap iterator with a fixed error.
#[derive(Debug)]
struct BrokenSource {
    error: fn() -> TrustError,
}

impl RemoteObject for BrokenSource {
    fn interfaces(&self) -> Vec<Interface> {
        vec![echo()]
    }

    fn invoke(&self, method: &Method, _args: &[Value]) -> Result<Value> {
        Err(TrustError::Unsupported(method.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn trust_iterator_source(&self) -> Option<&dyn TrustIteratorSource> {
        Some(self)
    }
}

impl TrustIteratorSource for BrokenSource {
    fn proxy_trust_iterator(&self) -> Result<Box<dyn ProxyTrustIterator>> {
        Err((self.error)())
    }
}

#[test]
fn security_error_obtaining_iterator_propagates() {
    let broken: ProxyRef = Arc::new(BrokenSource {
        error: || TrustError::Security("iterator access denied".into()),
    });
    let ctx = BasicTrustContext::new();
    let result = ProxyTrustVerifier::new().is_trusted(&broken, &ctx);
    assert!(matches!(result, Err(TrustError::Security(_))));

    let ctx = BasicTrustContext::new().with_verifier(Arc::new(ProxyTrustVerifier::new()));
    let result = verify_object_trust(&broken, &ctx, &TrustConfig::default());
    assert!(matches!(result, Err(TrustError::Security(_))));
}

#[test]
fn remote_error_obtaining_iterator_is_not_trusted() {
    let broken: ProxyRef = Arc::new(BrokenSource {
        error: || TrustError::Remote("iterator unavailable".into()),
    });
    let ctx = BasicTrustContext::new();
    assert!(!ProxyTrustVerifier::new().is_trusted(&broken, &ctx).unwrap());
}

/// A bootstrap proxy whose `getProxyVerifier` is refused outright.
#[derive(Debug)]
struct RefusingBoot;

impl RemoteObject for RefusingBoot {
    fn interfaces(&self) -> Vec<Interface> {
        vec![
            Interface::REMOTE_METHOD_CONTROL,
            Interface::TRUST_EQUIVALENCE,
            Interface::PROXY_TRUST,
        ]
    }

    fn invoke(&self, method: &Method, _args: &[Value]) -> Result<Value> {
        Err(TrustError::Unsupported(method.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn method_control(&self) -> Option<&dyn RemoteMethodControl> {
        Some(self)
    }

    fn trust_equivalence(&self) -> Option<&dyn TrustEquivalence> {
        Some(self)
    }

    fn proxy_trust(&self) -> Option<&dyn ProxyTrust> {
        Some(self)
    }
}

impl RemoteMethodControl for RefusingBoot {
    fn set_constraints(&self, _constraints: Option<MethodConstraints>) -> Result<ProxyRef> {
        Ok(Arc::new(RefusingBoot))
    }

    fn get_constraints(&self) -> Result<Option<MethodConstraints>> {
        Ok(None)
    }
}

impl TrustEquivalence for RefusingBoot {
    fn check_trust_equivalence(&self, other: &ProxyRef) -> bool {
        other.as_any().is::<RefusingBoot>()
    }
}

impl ProxyTrust for RefusingBoot {
    fn get_proxy_verifier(&self) -> Result<Arc<dyn TrustVerifier>> {
        Err(TrustError::Security("getProxyVerifier not permitted".into()))
    }
}

#[test]
fn security_error_from_get_proxy_verifier_propagates() {
    let proxy: ProxyRef = ProxyTrustInvocationHandler::create_proxy(
        trust_interfaces(),
        main_proxy("echo"),
        Arc::new(RefusingBoot),
    )
    .unwrap();
    let ctx = BasicTrustContext::new();
    let result = ProxyTrustVerifier::new().is_trusted(&proxy, &ctx);
    assert!(matches!(result, Err(TrustError::Security(_))));

    // A later candidate that would be trusted is never consulted.
    let recording = Recording::new("good");
    let refusing: ProxyRef = Arc::new(RefusingBoot);
    let smart = SmartProxy::new(vec![
        refusing,
        boot_with("good", recording.clone()),
    ]);
    let failures = smart.failures.clone();
    let smart: ProxyRef = smart;
    let result = ProxyTrustVerifier::new().is_trusted(&smart, &ctx);
    assert!(matches!(result, Err(TrustError::Security(_))));
    assert!(recording.seen().is_empty());
    assert!(failures.lock().unwrap().is_empty());
}

// ── Handler precedence ────────────────────────────────────────────────────────

/// Exposes both a handler iterator and its own iterator.
#[derive(Debug)]
struct DualSource {
    handler: ProxyTrustInvocationHandler,
    own: Arc<SmartProxy>,
}

impl RemoteObject for DualSource {
    fn interfaces(&self) -> Vec<Interface> {
        trust_interfaces()
    }

    fn invoke(&self, method: &Method, _args: &[Value]) -> Result<Value> {
        Err(TrustError::Unsupported(method.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn trust_iterator_source(&self) -> Option<&dyn TrustIteratorSource> {
        Some(self.own.as_ref())
    }

    fn invocation_handler(&self) -> Option<&dyn proxy_trust::InvocationHandler> {
        Some(&self.handler)
    }
}

#[test]
fn handler_iterator_takes_precedence() {
    let trusted_via_handler: ProxyRef = Arc::new(DualSource {
        handler: ProxyTrustInvocationHandler::new(main_proxy("m"), self_trusting_boot("h-boot"))
            .unwrap(),
        own: SmartProxy::new(vec![boot_with("own-boot", Arc::new(NamedTrustVerifier::new(["x"])))]),
    });
    let untrusted_via_handler: ProxyRef = Arc::new(DualSource {
        handler: ProxyTrustInvocationHandler::new(
            main_proxy("m"),
            boot_with("h-boot", Arc::new(NamedTrustVerifier::new(["x"]))),
        )
        .unwrap(),
        own: SmartProxy::new(vec![self_trusting_boot("own-boot")]),
    });
    let ctx = BasicTrustContext::new();
    let verifier = ProxyTrustVerifier::new();
    assert!(verifier.is_trusted(&trusted_via_handler, &ctx).unwrap());
    assert!(!verifier.is_trusted(&untrusted_via_handler, &ctx).unwrap());
}

// ── Caller constraints ────────────────────────────────────────────────────────

/// A bootstrap proxy that only answers `getProxyVerifier` under constraints.
#[derive(Debug, Clone)]
struct GuardedBoot {
    constraints: Option<MethodConstraints>,
}

impl RemoteObject for GuardedBoot {
    fn interfaces(&self) -> Vec<Interface> {
        vec![
            Interface::REMOTE_METHOD_CONTROL,
            Interface::TRUST_EQUIVALENCE,
            Interface::PROXY_TRUST,
        ]
    }

    fn invoke(&self, method: &Method, _args: &[Value]) -> Result<Value> {
        Err(TrustError::Unsupported(method.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn method_control(&self) -> Option<&dyn RemoteMethodControl> {
        Some(self)
    }

    fn trust_equivalence(&self) -> Option<&dyn TrustEquivalence> {
        Some(self)
    }

    fn proxy_trust(&self) -> Option<&dyn ProxyTrust> {
        Some(self)
    }
}

impl RemoteMethodControl for GuardedBoot {
    fn set_constraints(&self, constraints: Option<MethodConstraints>) -> Result<ProxyRef> {
        Ok(Arc::new(Self { constraints }))
    }

    fn get_constraints(&self) -> Result<Option<MethodConstraints>> {
        Ok(self.constraints.clone())
    }
}

impl TrustEquivalence for GuardedBoot {
    fn check_trust_equivalence(&self, other: &ProxyRef) -> bool {
        other.as_any().is::<GuardedBoot>()
    }
}

impl ProxyTrust for GuardedBoot {
    fn get_proxy_verifier(&self) -> Result<Arc<dyn TrustVerifier>> {
        let constraints = self
            .constraints
            .as_ref()
            .ok_or_else(|| TrustError::Remote("connection refused without integrity".into()))?;
        let required = constraints.get_constraints(&Method::GET_PROXY_VERIFIER);
        if !required
            .requirements()
            .contains(&InvocationConstraint::INTEGRITY_YES)
        {
            return Err(TrustError::Remote("integrity not requested".into()));
        }
        Ok(Arc::new(AcceptGuarded))
    }
}

#[derive(Debug)]
struct AcceptGuarded;

impl TrustVerifier for AcceptGuarded {
    fn is_trusted_object(
        &self,
        obj: &ProxyRef,
        _ctx: &dyn TrustContext,
        _budget: &mut VisitBudget,
    ) -> Result<bool> {
        Ok(obj.as_any().is::<GuardedBoot>())
    }
}

#[test]
fn caller_constraints_attached_to_bootstrap_calls() {
    let proxy: ProxyRef = ProxyTrustInvocationHandler::create_proxy(
        trust_interfaces(),
        main_proxy("echo"),
        Arc::new(GuardedBoot { constraints: None }),
    )
    .unwrap();
    let verifier = ProxyTrustVerifier::new();

    let bare = BasicTrustContext::new();
    assert!(!verifier.is_trusted(&proxy, &bare).unwrap());

    let constrained = BasicTrustContext::new().with_item(ContextItem::Constraints(integrity()));
    assert!(verifier.is_trusted(&proxy, &constrained).unwrap());
}

// ── Handler invariants ────────────────────────────────────────────────────────

#[test]
fn pairing_invariant_each_capability() {
    let boot_without_rmc: ProxyRef = BasicProxy::builder("b").trust_equivalence().build();
    let boot_without_te: ProxyRef = BasicProxy::builder("b").method_control().build();
    let main_without_te: ProxyRef = BasicProxy::builder("m").method_control().build();

    for (main, boot) in [
        (main_proxy("m"), boot_without_rmc),
        (main_proxy("m"), boot_without_te),
        (main_without_te, self_trusting_boot("b")),
    ] {
        let result = ProxyTrustInvocationHandler::new(main, boot);
        assert!(matches!(result, Err(TrustError::IllegalArgument(_))));
    }
}

#[test]
fn set_constraints_returns_new_proxy_with_same_boot() {
    let boot = self_trusting_boot("boot");
    let proxy =
        ProxyTrustInvocationHandler::create_proxy(trust_interfaces(), main_proxy("echo"), boot.clone())
            .unwrap();
    let constrained = proxy
        .method_control()
        .unwrap()
        .set_constraints(Some(integrity()))
        .unwrap();

    let original: ProxyRef = proxy.clone();
    assert!(!Arc::ptr_eq(&original, &constrained));

    let dynamic = constrained.as_any().downcast_ref::<DynamicProxy>().unwrap();
    let handler = dynamic
        .handler()
        .as_any()
        .downcast_ref::<ProxyTrustInvocationHandler>()
        .unwrap();
    assert!(Arc::ptr_eq(handler.boot(), &boot));
    assert!(!handler.main().equals(&main_proxy("echo")));
    assert!(handler
        .main()
        .trust_equivalence()
        .unwrap()
        .check_trust_equivalence(&main_proxy("echo")));

    // The constrained proxy still verifies through the same bootstrap.
    let ctx = BasicTrustContext::new();
    assert!(ProxyTrustVerifier::new().is_trusted(&constrained, &ctx).unwrap());
}

#[test]
fn trust_equivalence_requires_both_halves() {
    let make = |main: &str, boot: &str| -> ProxyRef {
        ProxyTrustInvocationHandler::create_proxy(
            trust_interfaces(),
            main_proxy(main),
            self_trusting_boot(boot),
        )
        .unwrap()
    };
    let base = make("echo", "boot");
    let te = base.trust_equivalence().unwrap();
    assert!(te.check_trust_equivalence(&make("echo", "boot")));
    assert!(!te.check_trust_equivalence(&make("echo", "other-boot")));
    assert!(!te.check_trust_equivalence(&make("other", "boot")));
    assert!(!te.check_trust_equivalence(&main_proxy("echo")));
}
