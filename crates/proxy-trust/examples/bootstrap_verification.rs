//! Bootstrap Verification: pair a service proxy with a bootstrap proxy,
//! verify it, then negotiate a connection for its calls.
//!
//! Run with:
//!   cargo run --example bootstrap_verification -p proxy-trust

use std::sync::Arc;

use proxy_trust::constraint::{InvocationConstraint, InvocationConstraints, MethodConstraints};
use proxy_trust::proxy::{describe, BasicProxy, Interface, Method, ProxyRef, RemoteObject};
use proxy_trust::verify::{
    verify_object_trust, BasicTrustContext, ContextItem, NamedTrustVerifier, ProxyTrustVerifier,
};
use proxy_trust::{ConnectionContext, Principal, ProxyTrustInvocationHandler, TrustConfig};

fn main() {
    // ── Setup: a service and the bootstrap proxy that vouches for it ────────
    let echo = Interface::new("Echo");
    let main_proxy: ProxyRef = BasicProxy::builder("echo")
        .interface(echo.clone())
        .method_control()
        .trust_equivalence()
        .build();
    let boot: ProxyRef = BasicProxy::builder("echo-boot")
        .method_control()
        .trust_equivalence()
        .verifier(Arc::new(NamedTrustVerifier::new(["echo-boot"])))
        .build();

    let proxy: ProxyRef = ProxyTrustInvocationHandler::create_proxy(
        vec![
            echo.clone(),
            Interface::REMOTE_METHOD_CONTROL,
            Interface::TRUST_EQUIVALENCE,
        ],
        main_proxy,
        boot,
    )
    .expect("main and bootstrap proxies should pair");

    println!("Proxy: {}", describe(&proxy));
    println!();

    // ── 1. Verify through the bootstrap proxy ───────────────────────────────
    let config = TrustConfig::default();
    let ctx = BasicTrustContext::new()
        .with_verifier(Arc::new(ProxyTrustVerifier::with_config(config.clone())));
    match verify_object_trust(&proxy, &ctx, &config) {
        Ok(()) => println!("1. Verified: the bootstrap proxy vouches for the service"),
        Err(e) => println!("1. Not verified: {e}"),
    }

    // ── 2. Calls on the verified proxy reach the service ────────────────────
    let reply = proxy
        .invoke(&Method::new(echo, "ping"), &[])
        .and_then(|v| v.into_string())
        .expect("echo should answer");
    println!("2. Echo.ping -> {reply}");

    // ── 3. Constrain the bootstrap calls and verify again ───────────────────
    let integrity = InvocationConstraints::new(vec![InvocationConstraint::INTEGRITY_YES], vec![])
        .expect("integrity constraints are valid");
    let constrained_ctx = BasicTrustContext::new()
        .with_verifier(Arc::new(ProxyTrustVerifier::with_config(config.clone())))
        .with_item(ContextItem::Constraints(MethodConstraints::uniform(integrity)));
    let verdict = verify_object_trust(&proxy, &constrained_ctx, &config);
    println!("3. Verified with integrity on bootstrap calls: {}", verdict.is_ok());

    // ── 4. Negotiate a connection for calls that require integrity ──────────
    let server = Principal::x500("CN=echo.example");
    let suites = [
        "TLS_RSA_WITH_NULL_SHA",
        "TLS_DH_anon_WITH_AES_128_CBC_SHA",
        "TLS_RSA_WITH_AES_128_CBC_SHA",
    ];
    let preferring = InvocationConstraints::new(
        vec![InvocationConstraint::INTEGRITY_YES],
        vec![InvocationConstraint::CONFIDENTIALITY_YES],
    )
    .expect("constraints are valid");
    match ConnectionContext::negotiate(suites, None, Some(&server), true, true, &preferring) {
        Some(best) => println!("4. Negotiated {best}"),
        None => println!("4. No suite satisfies the constraints"),
    }
}
