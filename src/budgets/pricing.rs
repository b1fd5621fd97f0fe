//! The single derivation path for budget money. Every view of a budget's
//! hours and price goes through `price_budget`; nothing else multiplies
//! rates, so persisted summaries and export views cannot drift apart.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::BudgetItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Standard,
    Pro,
    Unknown(String),
}

impl Tier {
    pub fn as_wire(&self) -> &str {
        match self {
            Tier::Fast => "fast",
            Tier::Standard => "standard",
            Tier::Pro => "pro",
            Tier::Unknown(raw) => raw,
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "fast" => Tier::Fast,
            "standard" => Tier::Standard,
            "pro" => Tier::Pro,
            other => {
                log::warn!("unknown tier value {other:?}");
                Tier::Unknown(other.to_string())
            }
        }
    }
}

impl Serialize for Tier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Tier::from_wire(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCategory {
    Web,
    Branding,
    Content,
    Growth,
}

impl ServiceCategory {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ServiceCategory::Web => "web",
            ServiceCategory::Branding => "branding",
            ServiceCategory::Content => "content",
            ServiceCategory::Growth => "growth",
        }
    }
}

impl Serialize for ServiceCategory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRate {
    pub label: &'static str,
    pub category: ServiceCategory,
    pub base_hours: f64,
    pub base_price: f64,
}

/// Base rates per service. The `standard` tier reproduces these exactly.
pub static RATE_TABLE: Lazy<HashMap<&'static str, ServiceRate>> = Lazy::new(|| {
    use ServiceCategory::*;
    let mut m = HashMap::new();
    let mut rate = |id, label, category, base_hours, base_price| {
        m.insert(
            id,
            ServiceRate {
                label,
                category,
                base_hours,
                base_price,
            },
        );
    };
    rate("web.landing_page", "Landing page", Web, 16.0, 600.0);
    rate("web.corporate_site", "Corporate site", Web, 60.0, 2400.0);
    rate("web.ecommerce", "E-commerce build", Web, 120.0, 5200.0);
    rate("web.web_app", "Web application", Web, 160.0, 7000.0);
    rate("branding.logo", "Logo design", Branding, 24.0, 900.0);
    rate("branding.identity_kit", "Identity kit", Branding, 48.0, 2000.0);
    rate("branding.rebrand", "Full rebrand", Branding, 90.0, 3800.0);
    rate("content.blog_pack", "Blog pack (4 posts)", Content, 12.0, 420.0);
    rate("content.social_kit", "Social media kit", Content, 20.0, 700.0);
    rate("content.copywriting", "Site copywriting", Content, 16.0, 560.0);
    rate("growth.seo_audit", "SEO audit", Growth, 18.0, 650.0);
    rate("growth.ads_setup", "Paid ads setup", Growth, 22.0, 800.0);
    m
});

/// Per-category tier multipliers. `standard` is 1.0 in every row.
pub fn tier_multiplier(category: ServiceCategory, tier: &Tier) -> Option<f64> {
    let (fast, pro) = match category {
        ServiceCategory::Web => (0.7, 1.6),
        ServiceCategory::Branding => (0.75, 1.5),
        ServiceCategory::Content => (0.8, 1.4),
        ServiceCategory::Growth => (0.7, 1.8),
    };
    match tier {
        Tier::Fast => Some(fast),
        Tier::Standard => Some(1.0),
        Tier::Pro => Some(pro),
        Tier::Unknown(_) => None,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePricing {
    pub service_id: String,
    pub label: &'static str,
    pub category: ServiceCategory,
    pub tier: Tier,
    pub hours: f64,
    pub price: f64,
}

/// Unknown service ids (or tiers) yield `None` and are excluded from
/// totals; a stale line in a persisted budget degrades to a no-op rather
/// than an error.
pub fn compute_service_pricing(service_id: &str, tier: &Tier) -> Option<ServicePricing> {
    let rate = RATE_TABLE.get(service_id)?;
    let multiplier = tier_multiplier(rate.category, tier)?;
    Some(ServicePricing {
        service_id: service_id.to_string(),
        label: rate.label,
        category: rate.category,
        tier: tier.clone(),
        hours: rate.base_hours * multiplier,
        price: rate.base_price * multiplier,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedBudget {
    pub lines: Vec<ServicePricing>,
    pub total_hours: f64,
    pub total_price: f64,
}

pub fn price_budget(items: &[BudgetItem]) -> PricedBudget {
    let lines: Vec<ServicePricing> = items
        .iter()
        .filter_map(|item| compute_service_pricing(&item.service_id, &item.tier))
        .collect();
    let total_hours = lines.iter().map(|l| l.hours).sum();
    let total_price = lines.iter().map(|l| l.price).sum();
    PricedBudget {
        lines,
        total_hours,
        total_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tier_reproduces_base_rates() {
        for (id, rate) in RATE_TABLE.iter() {
            let priced = compute_service_pricing(id, &Tier::Standard).unwrap();
            assert_eq!(priced.hours, rate.base_hours, "hours for {id}");
            assert_eq!(priced.price, rate.base_price, "price for {id}");
        }
    }

    #[test]
    fn every_known_pair_multiplies_base_rates() {
        for (id, rate) in RATE_TABLE.iter() {
            for tier in [Tier::Fast, Tier::Standard, Tier::Pro] {
                let multiplier = tier_multiplier(rate.category, &tier).unwrap();
                let priced = compute_service_pricing(id, &tier).unwrap();
                assert!((priced.hours - rate.base_hours * multiplier).abs() < 1e-9);
                assert!((priced.price - rate.base_price * multiplier).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn fast_landing_page_matches_rate_card() {
        let priced = compute_service_pricing("web.landing_page", &Tier::Fast).unwrap();
        assert!((priced.hours - 11.2).abs() < 1e-9);
        assert!((priced.price - 420.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_service_is_excluded_from_totals() {
        assert!(compute_service_pricing("web.hologram", &Tier::Standard).is_none());

        let items = vec![
            BudgetItem {
                service_id: "web.landing_page".to_string(),
                tier: Tier::Fast,
            },
            BudgetItem {
                service_id: "web.hologram".to_string(),
                tier: Tier::Pro,
            },
        ];
        let priced = price_budget(&items);
        assert_eq!(priced.lines.len(), 1);
        assert!((priced.total_hours - 11.2).abs() < 1e-9);
        assert!((priced.total_price - 420.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_tier_is_excluded_like_unknown_service() {
        let items = vec![BudgetItem {
            service_id: "web.landing_page".to_string(),
            tier: Tier::Unknown("turbo".to_string()),
        }];
        let priced = price_budget(&items);
        assert!(priced.lines.is_empty());
        assert_eq!(priced.total_price, 0.0);
    }
}
