//! Module fetch via the browser Fetch API

#![cfg(target_arch = "wasm32")]

use super::error::{ShimError, ShimResult};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Download the guest module bytes from `url`
pub async fn fetch_module(url: &str) -> ShimResult<Vec<u8>> {
    let fail = |reason: String| ShimError::Fetch {
        url: url.to_string(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| fail("no window object".to_string()))?;

    let opts = web_sys::RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(web_sys::RequestMode::SameOrigin);

    let request = web_sys::Request::new_with_str_and_init(url, &opts)
        .map_err(|e| fail(format!("failed to create request: {:?}", e)))?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| fail(format!("fetch failed: {:?}", e)))?;

    let resp: web_sys::Response = resp_value
        .dyn_into()
        .map_err(|_| fail("failed to cast response".to_string()))?;

    if !resp.ok() {
        return Err(fail(format!("HTTP {} {}", resp.status(), resp.status_text())));
    }

    let array_buffer = JsFuture::from(
        resp.array_buffer()
            .map_err(|e| fail(format!("failed to get body: {:?}", e)))?,
    )
    .await
    .map_err(|e| fail(format!("failed to read body: {:?}", e)))?;

    Ok(js_sys::Uint8Array::new(&array_buffer).to_vec())
}
