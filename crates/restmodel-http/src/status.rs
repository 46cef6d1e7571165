//! HTTP status codes and reason phrases.

/// Statuses a client accepts unless configured otherwise.
pub const DEFAULT_SUCCESS: [u16; 3] = [200, 201, 202];

/// Reason phrase for a status code.
pub fn reason(code: u16) -> Option<&'static str> {
    let text = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        507 => "Insufficient Storage",
        509 => "Bandwidth Limit Exceeded",
        510 => "Not Extended",
        511 => "Network Authentication Required",
        _ => return None,
    };
    Some(text)
}

pub fn is_known(code: u16) -> bool {
    reason(code).is_some()
}

/// Integer coercion of a status line: leading digits, else 0.
pub fn coerce(raw: &str) -> u16 {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

/// Unrecognized codes are reported as 500.
pub fn normalize(code: u16) -> u16 {
    if is_known(code) { code } else { 500 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_phrases() {
        assert_eq!(reason(200), Some("OK"));
        assert_eq!(reason(404), Some("Not Found"));
        assert_eq!(reason(599), None);
    }

    #[test]
    fn coerce_reads_leading_digits() {
        assert_eq!(coerce("201 Created"), 201);
        assert_eq!(coerce("  404"), 404);
        assert_eq!(coerce("teapot"), 0);
        assert_eq!(coerce("99999"), 0);
    }

    #[test]
    fn normalize_maps_unknown_to_500() {
        assert_eq!(normalize(418), 500);
        assert_eq!(normalize(0), 500);
        assert_eq!(normalize(503), 503);
    }
}
