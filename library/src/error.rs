use wasm_bindgen::JsValue;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the browser are `JsValue`s, which are neither `Send` nor `std::error::Error`.
pub(crate) fn js_error(context: &str, err: &JsValue) -> Error {
    let detail = err
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"));
    anyhow::anyhow!("{context}: {detail}")
}
