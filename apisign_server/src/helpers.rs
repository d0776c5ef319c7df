use actix_web::http::header::HeaderMap;
use apisign_common::parse_flag;
use log::trace;

pub const APP_CODE_HEADER: &str = "Sign-appCode";
pub const SIGN_HEADER: &str = "Sign-sign";
pub const TIME_HEADER: &str = "Sign-time";
pub const PATH_HEADER: &str = "Sign-path";
pub const WITH_PARAMS_HEADER: &str = "Sign-withParams";
pub const DYNAMIC_SALT_HEADER: &str = "Sign-dynamicSalt";
pub const DYNAMIC_SALT_TIME_HEADER: &str = "Sign-dynamicSaltTime";

/// The trimmed value of header `name`. Blank and non-ASCII values count as absent.
pub fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        trace!("Ignoring blank {name} header");
        None
    } else {
        Some(value.to_string())
    }
}

/// `Some(flag)` if header `name` holds a recognisable flag.
pub fn header_flag(headers: &HeaderMap, name: &str) -> Option<bool> {
    header_string(headers, name).and_then(|v| parse_flag(&v))
}

/// Headers win over body fields. Blank body fields count as absent.
pub fn header_or_body(header: Option<String>, body: Option<&String>) -> Option<String> {
    header.or_else(|| body.map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from))
}
