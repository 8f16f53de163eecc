//! Browser bindings against a real `window`. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Object, Reflect};
use serde_json::{Value, json};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use walletkit::wallet::{BrowserGlobals, JsInjected, LocalSessionStore};
use walletkit_core::SessionStore;
use walletkit_core::detector::{self, WalletKind};
use walletkit_core::provider::{Globals, InjectedProvider};

wasm_bindgen_test_configure!(run_in_browser);

fn fake_provider(request_body: &str) -> Object {
    let provider = Object::new();
    let request = Function::new_with_args("args", request_body);
    Reflect::set(&provider, &"request".into(), &request).unwrap();
    let noop = Function::new_no_args("");
    Reflect::set(&provider, &"on".into(), &noop).unwrap();
    Reflect::set(&provider, &"removeListener".into(), &noop).unwrap();
    provider
}

fn install(key: &str, provider: &Object) {
    let window = web_sys::window().unwrap();
    Reflect::set(&window, &key.into(), provider).unwrap();
}

fn uninstall(key: &str) {
    let window = web_sys::window().unwrap();
    Reflect::delete_property(&window, &key.into()).unwrap();
}

#[wasm_bindgen_test]
fn test_local_store_roundtrip() {
    let store = LocalSessionStore;
    store.clear();
    assert_eq!(store.load(), None);
    store.save("metamask");
    assert_eq!(store.load().as_deref(), Some("metamask"));
    store.clear();
    assert_eq!(store.load(), None);
}

#[wasm_bindgen_test]
fn test_probe_reads_window_flags() {
    let provider = fake_provider("return Promise.resolve(null);");
    Reflect::set(&provider, &"isMetaMask".into(), &JsValue::TRUE).unwrap();
    install("ethereum", &provider);

    let globals = BrowserGlobals::new();
    assert!(detector::probe(WalletKind::MetaMask, &globals));
    assert!(!detector::probe(WalletKind::Brave, &globals));
    assert!(globals.injected("ethereum").is_some());

    uninstall("ethereum");
    assert!(!detector::probe(WalletKind::MetaMask, &globals));
}

#[wasm_bindgen_test]
async fn test_request_passes_method_and_params() {
    let provider = JsInjected::new(fake_provider(
        "return Promise.resolve({ method: args.method, params: args.params });",
    ));

    let echoed = provider
        .request("wallet_switchEthereumChain", Some(json!([{ "chainId": "0x89" }])))
        .await
        .unwrap();
    assert_eq!(echoed["method"], json!("wallet_switchEthereumChain"));
    assert_eq!(echoed["params"], json!([{ "chainId": "0x89" }]));
}

#[wasm_bindgen_test]
async fn test_rejection_maps_code_and_message() {
    let provider = JsInjected::new(fake_provider(
        "return Promise.reject({ code: 4902, message: 'Unrecognized chain ID' });",
    ));

    let err = provider.request("wallet_switchEthereumChain", None).await.unwrap_err();
    assert!(err.is_unrecognized_chain());
    assert_eq!(err.message, "Unrecognized chain ID");
}

#[wasm_bindgen_test]
async fn test_null_result_is_json_null() {
    let provider = JsInjected::new(fake_provider("return Promise.resolve(null);"));
    let result = provider.request("wallet_addEthereumChain", None).await.unwrap();
    assert_eq!(result, Value::Null);
}
