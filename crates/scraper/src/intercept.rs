//! Request interception: abort cosmetic resource loads before they hit the
//! network. The page under automation is read, not looked at.

use {
    chromiumoxide::{
        Page,
        cdp::browser_protocol::{
            fetch::{ContinueRequestParams, EventRequestPaused, FailRequestParams},
            network::{ErrorReason, ResourceType},
        },
    },
    futures::StreamExt,
    tokio::task::JoinHandle,
    tracing::{debug, trace},
};

use crate::error::ScrapeError;

fn is_blocked(resource_type: &ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Image | ResourceType::Font | ResourceType::Media | ResourceType::Stylesheet
    )
}

/// Attach the resource filter to a page. Every paused request gets exactly
/// one verdict: abort for cosmetic resource types, continue for the rest.
///
/// Interception is enabled at the connection level, so this only has to
/// consume the paused-request events.
pub(crate) async fn install(page: &Page) -> Result<JoinHandle<()>, ScrapeError> {
    let mut events = page.event_listener::<EventRequestPaused>().await?;
    let page = page.clone();

    let task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let request_id = event.request_id.clone();
            let verdict = if is_blocked(&event.resource_type) {
                trace!(url = %event.request.url, resource_type = ?event.resource_type, "aborting request");
                page.execute(FailRequestParams::new(request_id, ErrorReason::Aborted))
                    .await
                    .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(request_id))
                    .await
                    .map(|_| ())
            };
            if let Err(error) = verdict {
                // The page is gone or the session is closing; stop filtering.
                debug!(%error, "request verdict failed, stopping interception");
                break;
            }
        }
    });

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_resource_types_are_blocked() {
        for blocked in [
            ResourceType::Image,
            ResourceType::Font,
            ResourceType::Media,
            ResourceType::Stylesheet,
        ] {
            assert!(is_blocked(&blocked), "{blocked:?} should be blocked");
        }
    }

    #[test]
    fn functional_resource_types_pass_through() {
        for allowed in [
            ResourceType::Document,
            ResourceType::Script,
            ResourceType::Xhr,
            ResourceType::Fetch,
            ResourceType::WebSocket,
        ] {
            assert!(!is_blocked(&allowed), "{allowed:?} must not be blocked");
        }
    }
}
