use crate::domain::Request;
use crate::ports::IdentifyStrategy;

/// Routes a text request by its first whitespace-delimited token, so
/// `"ping\r\n"` and `"echo hello\r\n"` go to `ping` and `echo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineIdentifier;

impl IdentifyStrategy for LineIdentifier {
    fn identify(&self, request: &Request) -> Option<String> {
        request
            .text()
            .split_whitespace()
            .next()
            .map(str::to_string)
    }
}
