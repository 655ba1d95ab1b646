//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! ```rust
//! use schemagate::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! async fn clear_todos(_req: schemagate::Request) -> Status {
//!     Status::NoContent
//! }
//! ```

/// The status codes this crate's host and handlers answer with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    NoContent,           // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    NotFound,            // 404
    MethodNotAllowed,    // 405
    NotAcceptable,       // 406
    ContentTooLarge,     // 413

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::Created             => 201,
            Status::NoContent           => 204,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::NotAcceptable       => 406,
            Status::ContentTooLarge     => 413,
            Status::InternalServerError => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_their_variants() {
        let codes: Vec<u16> = [
            Status::Ok,
            Status::Created,
            Status::NoContent,
            Status::BadRequest,
            Status::NotFound,
            Status::MethodNotAllowed,
            Status::NotAcceptable,
            Status::ContentTooLarge,
            Status::InternalServerError,
        ]
        .into_iter()
        .map(u16::from)
        .collect();
        assert_eq!(codes, [200, 201, 204, 400, 404, 405, 406, 413, 500]);
    }
}
