//! Plain-text rendering of lead summaries for the terminal

use std::fmt::Write;
use types::LeadSummary;

const RULE: &str = "------------------------------------------------------------";

/// One block per summary, in the order given. `detailed` adds the long
/// summary and the contact details.
pub fn render_summaries(summaries: &[LeadSummary], detailed: bool) -> String {
    let mut out = String::new();
    if summaries.is_empty() {
        out.push_str("No leads matched your criteria.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "Found {} potential leads matching your criteria!",
        summaries.len()
    );
    for (i, summary) in summaries.iter().enumerate() {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "LEAD {}/{}", i + 1, summaries.len());
        let _ = writeln!(out, "COMPANY: {} ({})", summary.company_name, summary.industry);
        let _ = writeln!(out, "CONFIDENCE: {}", summary.confidence);
        let _ = writeln!(out, "PRICE: ${:.2}", summary.price);
        let _ = writeln!(out, "\nTLDR SUMMARY:\n{}", summary.tldr);

        if !summary.knowledge_connections.is_empty() {
            let _ = writeln!(out, "\nCONNECTIONS:");
            for connection in &summary.knowledge_connections {
                let _ = writeln!(out, "- {connection}");
            }
        }

        if detailed {
            let _ = writeln!(out, "\nDETAILED SUMMARY:\n{}", summary.detailed);
            let _ = writeln!(out, "Website: {}", summary.encrypted_contact.website);
            let _ = writeln!(out, "Contact: {}", summary.encrypted_contact.contact);
        }
    }
    let _ = writeln!(out, "{RULE}");
    out
}
