//! Rule-based narrative: fixed pros/cons sentences driven by score
//! thresholds, plus category-specific additions. Deliberately not
//! generative — the ordering is the insertion order of rule evaluation and
//! is stable for identical inputs.

use serde::Serialize;

use crate::catalog::normalize_category;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Insights {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Generates pros and cons for the three scores and business category.
/// Category rules match on the normalized name (substring, so "corner cafe"
/// still gets the cafe sentences); unrecognized categories only receive the
/// general and contextual sentences.
pub fn generate_insights(
    business_type: &str,
    demand: u8,
    risk: u8,
    competition: u8,
    city: Option<&str>,
    radius_m: u32,
) -> Insights {
    let mut pros: Vec<String> = Vec::new();
    let mut cons: Vec<String> = Vec::new();

    if demand >= 65 {
        pros.push("Strong local demand near the chosen location.".to_string());
    } else if demand >= 45 {
        pros.push("Moderate demand levels in the area.".to_string());
    } else {
        cons.push("Weak customer base; consider moving closer to high-footfall areas.".to_string());
    }

    if competition <= 35 {
        pros.push("Low market saturation - clear headroom for growth.".to_string());
    } else if competition <= 60 {
        pros.push("Moderate competition level allows for market entry.".to_string());
    } else {
        cons.push("Heavy competition within the catchment area.".to_string());
    }

    if risk <= 40 {
        pros.push("Operational risk appears manageable.".to_string());
    } else if risk <= 60 {
        pros.push("Moderate operational risk with careful planning needed.".to_string());
    } else {
        cons.push("High operational risk due to budget, hours, or market conditions.".to_string());
    }

    let category = normalize_category(business_type);

    if category.contains("cafe") {
        if competition > 60 {
            cons.push(
                "Many cafes nearby; consider focusing on a niche (breakfast/late-night)."
                    .to_string(),
            );
        } else {
            pros.push("Cafe format fits well with student/office crowd in this area.".to_string());
        }
        if demand >= 70 {
            pros.push("High foot traffic area ideal for coffee shops.".to_string());
        }
    } else if category.contains("gym") {
        if demand >= 60 {
            pros.push("Good fitness interest in the area; group classes could work well.".to_string());
        }
        if competition <= 40 {
            pros.push("Low gym density creates opportunity for fitness services.".to_string());
        } else {
            cons.push("Saturated fitness market; differentiate with unique offerings.".to_string());
        }
    } else if category.contains("stationery") {
        pros.push("Proximity to campus/offices favors stationery and print demand.".to_string());
        if demand >= 50 {
            pros.push("Good potential for office supply and printing services.".to_string());
        }
    } else if category.contains("hostel_mess") {
        if demand >= 55 {
            pros.push("Student density favors mess and meal plan services.".to_string());
        }
        if competition <= 30 {
            pros.push("Low competition in student dining sector.".to_string());
        } else {
            cons.push("High competition in student dining; focus on quality and pricing.".to_string());
        }
    } else if category.contains("restaurant") {
        if demand >= 60 {
            pros.push("Strong dining demand in the area.".to_string());
        }
        if competition <= 50 {
            pros.push("Moderate restaurant competition allows for market entry.".to_string());
        } else {
            cons.push("High restaurant density; focus on unique cuisine or service.".to_string());
        }
    } else if category.contains("retail") {
        if demand >= 55 {
            pros.push("Good retail potential in the area.".to_string());
        }
        if competition <= 40 {
            pros.push("Low retail competition creates opportunity.".to_string());
        } else {
            cons.push("Saturated retail market; focus on specific product categories.".to_string());
        }
    }

    let mut context = format!("Analysis covers {radius_m}m radius");
    if let Some(city) = city {
        context.push_str(&format!(" in {city}"));
    }
    context.push('.');
    pros.push(context);

    Insights { pros, cons }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cafe_with_quiet_market_reads_positive() {
        let insights = generate_insights("cafe", 60, 58, 20, None, 500);
        assert!(insights
            .pros
            .iter()
            .any(|p| p.starts_with("Cafe format fits well")));
        assert_eq!(
            insights.pros.last().map(String::as_str),
            Some("Analysis covers 500m radius.")
        );
        assert!(insights.cons.is_empty());
    }

    #[test]
    fn trailing_context_names_the_city_when_present() {
        let insights = generate_insights("gym", 50, 50, 50, Some("Pune"), 1200);
        assert_eq!(
            insights.pros.last().map(String::as_str),
            Some("Analysis covers 1200m radius in Pune.")
        );
    }

    #[test]
    fn weak_scores_accumulate_cons() {
        let insights = generate_insights("restaurant", 30, 80, 75, None, 500);
        assert!(insights.cons.iter().any(|c| c.contains("Weak customer base")));
        assert!(insights.cons.iter().any(|c| c.contains("Heavy competition")));
        assert!(insights.cons.iter().any(|c| c.contains("High operational risk")));
        assert!(insights
            .cons
            .iter()
            .any(|c| c.contains("High restaurant density")));
    }

    #[test]
    fn unrecognized_categories_get_only_general_sentences() {
        let insights = generate_insights("bookstore", 60, 50, 20, None, 500);
        // general demand + competition + risk pros, plus trailing context
        assert_eq!(insights.pros.len(), 4);
        assert!(insights.cons.is_empty());
    }

    #[test]
    fn category_rules_match_on_normalized_substrings() {
        let spaced = generate_insights("Hostel Mess", 60, 50, 20, None, 500);
        assert!(spaced
            .pros
            .iter()
            .any(|p| p.contains("mess and meal plan")));

        let embedded = generate_insights("Corner Cafe", 60, 50, 20, None, 500);
        assert!(embedded
            .pros
            .iter()
            .any(|p| p.starts_with("Cafe format fits well")));
    }

    #[test]
    fn ordering_is_stable_across_calls() {
        let a = generate_insights("cafe", 72, 45, 65, Some("Mysuru"), 800);
        let b = generate_insights("cafe", 72, 45, 65, Some("Mysuru"), 800);
        assert_eq!(a.pros, b.pros);
        assert_eq!(a.cons, b.cons);
    }
}
