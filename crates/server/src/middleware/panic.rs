use std::any::Any;

use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{error::AppError, logging::panic_message};

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Turns a handler panic into the `INTERNAL_ERROR` envelope. The panic text
/// is logged, never returned.
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(panic_response as PanicHandler)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic_message(&*panic);
    AppError::internal(format!("handler panicked: {details}")).into_response()
}
