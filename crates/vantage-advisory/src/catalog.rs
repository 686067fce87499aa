use vantage_protocol::{Insight, InsightAction, InsightAudit, InsightSeverity, PersonaTag};

/// One canned insight. An empty `personas` list applies to every persona.
pub(crate) struct CannedInsight {
    pub category_tag: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub confidence: f64,
    pub severity: InsightSeverity,
    pub actions: &'static [(&'static str, &'static str)],
    pub personas: &'static [PersonaTag],
}

impl CannedInsight {
    fn applies_to(&self, persona: PersonaTag) -> bool {
        self.personas.is_empty() || self.personas.contains(&persona)
    }

    fn materialize(&self, audit: &InsightAudit) -> Insight {
        self.actions.iter().fold(
            Insight::new(
                self.category_tag,
                self.title,
                self.subtitle,
                self.confidence,
                self.severity,
                audit.clone(),
            ),
            |insight, (label, action_id)| insight.with_action(InsightAction::new(*label, *action_id)),
        )
    }
}

const DASHBOARD: &[CannedInsight] = &[
    CannedInsight {
        category_tag: "kpi.revenue",
        title: "Revenue trending above forecast",
        subtitle: "Week-to-date revenue is 8% over the rolling forecast.",
        confidence: 0.82,
        severity: InsightSeverity::Info,
        actions: &[("Open revenue report", "report.revenue.open")],
        personas: &[],
    },
    CannedInsight {
        category_tag: "ops.fulfilment",
        title: "Fulfilment backlog growing",
        subtitle: "Open fulfilment tasks rose 23% since yesterday.",
        confidence: 0.74,
        severity: InsightSeverity::Warn,
        actions: &[
            ("Review backlog", "fulfilment.backlog.review"),
            ("Rebalance shifts", "fulfilment.shifts.rebalance"),
        ],
        personas: &[PersonaTag::Operator, PersonaTag::Analyst],
    },
    CannedInsight {
        category_tag: "procurement.savings",
        title: "Consolidation opportunity",
        subtitle: "Three suppliers cover overlapping catalog lines.",
        confidence: 0.61,
        severity: InsightSeverity::Info,
        actions: &[("Compare suppliers", "suppliers.compare")],
        personas: &[PersonaTag::Buyer],
    },
];

const ORDERS: &[CannedInsight] = &[
    CannedInsight {
        category_tag: "orders.delay",
        title: "Late shipments concentrated in one carrier",
        subtitle: "71% of late orders this week used the same carrier.",
        confidence: 0.78,
        severity: InsightSeverity::Warn,
        actions: &[("Filter late orders", "orders.filter.late")],
        personas: &[],
    },
    CannedInsight {
        category_tag: "orders.cancellation",
        title: "Cancellation spike",
        subtitle: "Cancellations doubled over the last 24 hours.",
        confidence: 0.66,
        severity: InsightSeverity::Critical,
        actions: &[
            ("Inspect cancellations", "orders.cancellations.inspect"),
            ("Notify support", "support.notify"),
        ],
        personas: &[PersonaTag::Operator],
    },
];

const INVENTORY: &[CannedInsight] = &[
    CannedInsight {
        category_tag: "inventory.stockout",
        title: "Projected stock-out in 5 days",
        subtitle: "Two fast-moving SKUs fall below safety stock next week.",
        confidence: 0.88,
        severity: InsightSeverity::Critical,
        actions: &[("Create purchase order", "purchase_order.create")],
        personas: &[],
    },
    CannedInsight {
        category_tag: "inventory.aging",
        title: "Slow-moving stock",
        subtitle: "Aged inventory above 90 days grew by 4%.",
        confidence: 0.57,
        severity: InsightSeverity::Info,
        actions: &[],
        personas: &[PersonaTag::Analyst, PersonaTag::Buyer],
    },
];

const SUPPLIERS: &[CannedInsight] = &[CannedInsight {
    category_tag: "suppliers.lead_time",
    title: "Lead times lengthening",
    subtitle: "Median supplier lead time rose from 6 to 9 days.",
    confidence: 0.69,
    severity: InsightSeverity::Warn,
    actions: &[("View supplier scorecard", "suppliers.scorecard.open")],
    personas: &[],
}];

fn table_for(view: &str) -> &'static [CannedInsight] {
    match view.trim().to_ascii_lowercase().as_str() {
        "dashboard" | "home" => DASHBOARD,
        "orders" => ORDERS,
        "inventory" => INVENTORY,
        "suppliers" => SUPPLIERS,
        _ => &[],
    }
}

/// Canned insights for `view` and `persona`, each stamped with `audit`.
pub(crate) fn insights_for(view: &str, persona: PersonaTag, audit: &InsightAudit) -> Vec<Insight> {
    table_for(view)
        .iter()
        .filter(|canned| canned.applies_to(persona))
        .map(|canned| canned.materialize(audit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_persona_sees_dashboard_insights() {
        let audit = InsightAudit::stamp("simulated", 1.0);
        for persona in PersonaTag::ALL {
            let insights = insights_for("dashboard", persona, &audit);
            assert!(!insights.is_empty(), "{persona}");
            assert!(insights.iter().all(|i| (0.0..=1.0).contains(&i.confidence)));
        }
    }

    #[test]
    fn persona_filters_apply() {
        let audit = InsightAudit::stamp("simulated", 1.0);
        let buyer = insights_for("dashboard", PersonaTag::Buyer, &audit);
        assert!(buyer.iter().any(|i| i.category_tag == "procurement.savings"));
        assert!(buyer.iter().all(|i| i.category_tag != "ops.fulfilment"));

        let operator = insights_for("dashboard", PersonaTag::Operator, &audit);
        let fulfilment = operator
            .iter()
            .find(|i| i.category_tag == "ops.fulfilment")
            .expect("operator sees fulfilment insight");
        assert_eq!(fulfilment.actions.len(), 2);
        assert_eq!(fulfilment.actions[0].action_id, "fulfilment.backlog.review");
    }

    #[test]
    fn unknown_view_has_no_insights() {
        let audit = InsightAudit::stamp("simulated", 1.0);
        assert!(insights_for("settings", PersonaTag::Buyer, &audit).is_empty());
    }
}
