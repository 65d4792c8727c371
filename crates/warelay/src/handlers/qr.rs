//! Pairing QR page.
//!
//! Renders the controller's current pairing code as an SVG QR for scanning
//! from a browser. Purely a read-only surface over the lifecycle snapshot.

use axum::extract::State;
use axum::response::Html;
use qrcode::QrCode;
use qrcode::render::svg;
use tracing::warn;

use crate::server::AppState;

/// GET /qr — HTML, not JSON.
pub async fn qr_page(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.lifecycle.snapshot();

    let Some(pairing) = snapshot.pairing_code else {
        return Html(format!(
            concat!(
                "<!DOCTYPE html><html><head><title>Warelay pairing</title></head><body>",
                "<h1>QR code not available</h1>",
                "<p>Connection state: <code>{}</code>.</p>",
                "<p>A code appears here while the session waits for pairing. ",
                "Refresh this page once the state is <code>waiting_for_scan</code>.</p>",
                "</body></html>"
            ),
            snapshot.state
        ));
    };

    let svg = match QrCode::new(pairing.code.as_bytes()) {
        Ok(qr) => qr
            .render::<svg::Color>()
            .min_dimensions(320, 320)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build(),
        Err(e) => {
            warn!(error = %e, "pairing payload does not fit a QR code");
            return Html(
                "<!DOCTYPE html><html><body><h1>QR render failed</h1>\
                 <p>Check the service logs for the raw pairing payload.</p></body></html>"
                    .to_string(),
            );
        }
    };

    Html(format!(
        concat!(
            "<!DOCTYPE html><html><head><title>Warelay pairing</title>",
            "<meta http-equiv=\"refresh\" content=\"20\"></head><body>",
            "<h1>Scan with WhatsApp</h1>",
            "<p>WhatsApp &gt; Linked Devices &gt; Link a Device</p>",
            "{}",
            "<p><small>Issued {}</small></p>",
            "</body></html>"
        ),
        svg,
        pairing.issued_at.to_rfc3339()
    ))
}
