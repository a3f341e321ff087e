use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use uuid::Uuid;

use crate::models::{Caller, Role};

/// Идентификатор покупателя, проставленный шлюзом аутентификации.
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";
/// Роль вызывающего: customer | staff | admin.
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Разбирает доверенные заголовки в `Caller`. Без роли считаем покупателем,
/// покупатель без id - не аутентифицирован.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, (StatusCode, String)> {
    let role = match header(headers, CALLER_ROLE_HEADER) {
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| (StatusCode::UNAUTHORIZED, e))?,
        None => Role::Customer,
    };

    let customer_id = match header(headers, CUSTOMER_ID_HEADER) {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            (StatusCode::UNAUTHORIZED, format!("invalid {CUSTOMER_ID_HEADER}"))
        })?),
        None => None,
    };

    if role == Role::Customer && customer_id.is_none() {
        return Err((StatusCode::UNAUTHORIZED, "caller identity is missing".to_string()));
    }

    Ok(Caller { customer_id, role })
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = caller_from_headers(&parts.headers);
        if let Err((_, reason)) = &caller {
            tracing::debug!("Rejected caller: {}", reason);
        }
        caller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn customer_needs_id() {
        let err = caller_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        let id = Uuid::new_v4();
        let caller = caller_from_headers(&headers(&[(CUSTOMER_ID_HEADER, &id.to_string())])).unwrap();
        assert_eq!(caller.customer_id, Some(id));
        assert_eq!(caller.role, Role::Customer);
    }

    #[test]
    fn staff_without_id_is_allowed() {
        let caller = caller_from_headers(&headers(&[(CALLER_ROLE_HEADER, "Staff")])).unwrap();
        assert_eq!(caller.role, Role::Staff);
        assert!(caller.customer_id.is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(caller_from_headers(&headers(&[(CUSTOMER_ID_HEADER, "42")])).is_err());
        assert!(caller_from_headers(&headers(&[(CALLER_ROLE_HEADER, "root")])).is_err());
    }
}
