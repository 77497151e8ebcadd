use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::session::{Session, SessionManager, SESSION_COOKIE_NAME};

/// Derives the request's session from the `auth_session` cookie, falling back to an
/// `Authorization: Bearer` header.
///
/// A valid session is inserted into the request extensions; nothing is rejected here.
/// Routes that need a session ask for it through the `AuthenticatedSession` extractor.
/// Rotated sessions get a fresh cookie on the way out and unusable tokens get a
/// removal cookie. A failing session store ends the request with a 500.
pub struct SessionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
}

/// What the response needs to tell the client about its session cookie.
enum CookieAction {
    Keep,
    Issue(Session),
    Clear,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let manager = req.app_data::<web::Data<SessionManager>>().cloned();
            let token = session_token(&req);

            let mut action = CookieAction::Keep;
            if let (Some(manager), Some(token)) = (&manager, token) {
                match manager.validate_session(&token).await {
                    Ok(Some(session)) => {
                        if session.fresh {
                            action = CookieAction::Issue(session.clone());
                        }
                        req.extensions_mut().insert(session);
                    }
                    Ok(None) => action = CookieAction::Clear,
                    // A store failure is a server fault, not a missing session.
                    Err(err) => return Err(err.into()),
                }
            }

            let mut res = service.call(req).await?;

            // Handlers that set the cookie themselves (sign-up, sign-in, sign-out) win.
            let handler_set_cookie = res
                .response()
                .cookies()
                .any(|cookie| cookie.name() == SESSION_COOKIE_NAME);
            if let (Some(manager), false) = (manager, handler_set_cookie) {
                match action {
                    CookieAction::Issue(session) => {
                        res.response_mut()
                            .add_cookie(&manager.session_cookie(&session))?;
                    }
                    CookieAction::Clear => {
                        res.response_mut().add_cookie(&manager.blank_cookie())?;
                    }
                    CookieAction::Keep => {}
                }
            }

            Ok(res)
        })
    }
}

fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
