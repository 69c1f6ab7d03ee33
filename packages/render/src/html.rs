use std::fmt::Write as _;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
pub const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// A standalone Leaflet page with an OpenStreetMap base layer. `script` runs
/// after the map is created and can refer to it as `map`.
pub struct LeafletPage<'a> {
    pub title: &'a str,
    pub center: (f64, f64),
    pub zoom: u8,
    pub plugins: &'a [&'a str],
    pub script: String,
}

impl LeafletPage<'_> {
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.script.len() + 2048);
        let _ = writeln!(out, "<!DOCTYPE html>");
        let _ = writeln!(out, "<html>\n<head>");
        let _ = writeln!(out, "<meta charset=\"utf-8\">");
        let _ = writeln!(
            out,
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
        );
        let _ = writeln!(out, "<title>{}</title>", escape(self.title));
        let _ = writeln!(out, "<link rel=\"stylesheet\" href=\"{LEAFLET_CSS}\">");
        let _ = writeln!(out, "<script src=\"{LEAFLET_JS}\"></script>");
        for plugin in self.plugins {
            let _ = writeln!(out, "<script src=\"{plugin}\"></script>");
        }
        let _ = writeln!(
            out,
            "<style>html, body, #map {{ height: 100%; margin: 0; }}</style>"
        );
        let _ = writeln!(out, "</head>\n<body>\n<div id=\"map\"></div>\n<script>");
        let _ = writeln!(
            out,
            "const map = L.map('map').setView([{}, {}], {});",
            self.center.0, self.center.1, self.zoom
        );
        let _ = writeln!(
            out,
            "L.tileLayer('{TILE_URL}', {{ maxZoom: 19, attribution: '{TILE_ATTRIBUTION}' }}).addTo(map);"
        );
        out.push_str(&self.script);
        let _ = writeln!(out, "</script>\n</body>\n</html>");
        out
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_contains_map_setup() {
        let page = LeafletPage {
            title: "A <b>title</b>",
            center: (42.3, -71.05),
            zoom: 13,
            plugins: &[LEAFLET_HEAT_JS],
            script: "// overlay\n".to_string(),
        }
        .render();

        assert!(page.contains("<title>A &lt;b&gt;title&lt;/b&gt;</title>"));
        assert!(page.contains("setView([42.3, -71.05], 13)"));
        assert!(page.contains(LEAFLET_HEAT_JS));
        assert!(page.contains("// overlay"));
        assert!(page.trim_end().ends_with("</html>"));
    }
}
