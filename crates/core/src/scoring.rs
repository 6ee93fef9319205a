//! Weighted scores, rating bands and rater discrepancies.

use appraisal_common::config::SectionWeights;
use appraisal_common::{AppError, AppResult};
use appraisal_db::entities::{manager_review, self_assessment};
use serde::Serialize;

/// Two raters disagree when their scores differ by at least this much.
pub const DISCREPANCY_THRESHOLD: f64 = 1.0;

/// A section score with its weight. Unscored sections carry `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSection {
    pub score: Option<f64>,
    pub weight: f64,
}

impl WeightedSection {
    #[must_use]
    pub const fn new(score: Option<f64>, weight: f64) -> Self {
        Self { score, weight }
    }
}

/// Weighted mean of the scored sections on the rating scale.
///
/// Unscored sections drop out of both sums. `None` when nothing is scored.
#[must_use]
pub fn weighted_average(sections: &[WeightedSection]) -> Option<f64> {
    let (sum, weight) = sections
        .iter()
        .filter_map(|s| s.score.map(|score| (score * s.weight, s.weight)))
        .fold((0.0, 0.0), |(sum, weight), (ws, w)| (sum + ws, weight + w));

    (weight > 0.0).then(|| sum / weight)
}

/// Weighted score as a percentage of `scale_max`, rounded to one decimal.
#[must_use]
pub fn weighted_score(sections: &[WeightedSection], scale_max: f64) -> Option<f64> {
    if scale_max <= 0.0 {
        return None;
    }
    weighted_average(sections).map(|avg| round_to(avg / scale_max * 100.0, 1))
}

/// Rating band of a percentage score. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RatingBand {
    Unacceptable,
    Average,
    Satisfactory,
    Exceptional,
}

impl RatingBand {
    /// Band a percentage score.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Self::Exceptional
        } else if percentage >= 60.0 {
            Self::Satisfactory
        } else if percentage >= 50.0 {
            Self::Average
        } else {
            Self::Unacceptable
        }
    }
}

/// Whether two raters disagree on a section. Advisory only.
#[must_use]
pub fn is_discrepancy(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() >= DISCREPANCY_THRESHOLD,
        _ => false,
    }
}

/// Round to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Reject ratings outside `[0, scale_max]`.
pub fn validate_rating(field: &str, value: f64, scale_max: f64) -> AppResult<()> {
    if value.is_finite() && (0.0..=scale_max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{field} must be between 0 and {scale_max}"
        )))
    }
}

/// Validate an optional rating.
pub fn validate_optional_rating(field: &str, value: Option<f64>, scale_max: f64) -> AppResult<()> {
    value.map_or(Ok(()), |v| validate_rating(field, v, scale_max))
}

/// The five competency sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Performance,
    TechnicalSkills,
    Communication,
    Teamwork,
    Leadership,
}

impl Section {
    pub const ALL: [Self; 5] = [
        Self::Performance,
        Self::TechnicalSkills,
        Self::Communication,
        Self::Teamwork,
        Self::Leadership,
    ];

    const fn weight(self, weights: &SectionWeights) -> f64 {
        match self {
            Self::Performance => weights.performance,
            Self::TechnicalSkills => weights.technical_skills,
            Self::Communication => weights.communication,
            Self::Teamwork => weights.teamwork,
            Self::Leadership => weights.leadership,
        }
    }

    const fn of_review(self, r: &manager_review::Model) -> f64 {
        match self {
            Self::Performance => r.performance_rating,
            Self::TechnicalSkills => r.technical_skills_rating,
            Self::Communication => r.communication_rating,
            Self::Teamwork => r.teamwork_rating,
            Self::Leadership => r.leadership_rating,
        }
    }

    const fn of_self_assessment(self, s: &self_assessment::Model) -> Option<f64> {
        match self {
            Self::Performance => s.performance_rating,
            Self::TechnicalSkills => s.technical_skills_rating,
            Self::Communication => s.communication_rating,
            Self::Teamwork => s.teamwork_rating,
            Self::Leadership => s.leadership_rating,
        }
    }
}

/// One section of a scorecard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionLine {
    pub section: Section,
    pub weight: f64,
    pub manager_rating: Option<f64>,
    pub self_rating: Option<f64>,
    pub discrepancy: bool,
}

/// Side-by-side scores of an appraisal's two raters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub appraisal_id: i32,
    pub sections: Vec<SectionLine>,
    /// Percentage from the manager review.
    pub manager_score: Option<f64>,
    /// Percentage from the self-assessment section ratings.
    pub self_score: Option<f64>,
    /// Band of the manager score.
    pub band: Option<RatingBand>,
    pub discrepancy_count: usize,
}

impl Scorecard {
    /// Build a scorecard from whichever assessments exist.
    #[must_use]
    pub fn build(
        appraisal_id: i32,
        weights: &SectionWeights,
        scale_max: f64,
        review: Option<&manager_review::Model>,
        assessment: Option<&self_assessment::Model>,
    ) -> Self {
        let sections: Vec<SectionLine> = Section::ALL
            .iter()
            .map(|&section| {
                let manager_rating = review.map(|r| section.of_review(r));
                let self_rating = assessment.and_then(|s| section.of_self_assessment(s));
                SectionLine {
                    section,
                    weight: section.weight(weights),
                    manager_rating,
                    self_rating,
                    discrepancy: is_discrepancy(manager_rating, self_rating),
                }
            })
            .collect();

        let manager: Vec<_> = sections
            .iter()
            .map(|l| WeightedSection::new(l.manager_rating, l.weight))
            .collect();
        let own: Vec<_> = sections
            .iter()
            .map(|l| WeightedSection::new(l.self_rating, l.weight))
            .collect();

        let manager_score = weighted_score(&manager, scale_max);
        let discrepancy_count = sections.iter().filter(|l| l.discrepancy).count();

        Self {
            appraisal_id,
            manager_score,
            self_score: weighted_score(&own, scale_max),
            band: manager_score.map(RatingBand::from_percentage),
            discrepancy_count,
            sections,
        }
    }
}

/// Overall rating derived from a manager review: the weighted section mean
/// on the rating scale, two decimals.
#[must_use]
pub fn overall_rating(review: &manager_review::Model, weights: &SectionWeights) -> Option<f64> {
    let sections: Vec<_> = Section::ALL
        .iter()
        .map(|&s| WeightedSection::new(Some(s.of_review(review)), s.weight(weights)))
        .collect();
    weighted_average(&sections).map(|avg| round_to(avg, 2))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use appraisal_db::entities::self_assessment::AssessmentStatus;
    use appraisal_db::test_utils::fixtures;

    fn uniform(score: f64) -> [WeightedSection; 3] {
        [
            WeightedSection::new(Some(score), 70.0),
            WeightedSection::new(Some(score), 20.0),
            WeightedSection::new(Some(score), 10.0),
        ]
    }

    #[test]
    fn test_full_marks_are_exceptional() {
        let score = weighted_score(&uniform(3.0), 3.0).unwrap();
        assert_eq!(score, 100.0);
        assert_eq!(RatingBand::from_percentage(score), RatingBand::Exceptional);
    }

    #[test]
    fn test_two_of_three_is_satisfactory() {
        let score = weighted_score(&uniform(2.0), 3.0).unwrap();
        assert_eq!(score, 66.7);
        assert_eq!(RatingBand::from_percentage(score), RatingBand::Satisfactory);
    }

    #[test]
    fn test_nothing_scored_is_none() {
        let sections = [
            WeightedSection::new(None, 70.0),
            WeightedSection::new(None, 30.0),
        ];
        assert_eq!(weighted_score(&sections, 5.0), None);
        assert_eq!(weighted_score(&[], 5.0), None);
    }

    #[test]
    fn test_unscored_sections_are_excluded() {
        let sections = [
            WeightedSection::new(Some(4.0), 50.0),
            WeightedSection::new(None, 50.0),
        ];
        assert_eq!(weighted_score(&sections, 5.0), Some(80.0));
    }

    #[test]
    fn test_band_lower_bounds_inclusive() {
        assert_eq!(RatingBand::from_percentage(49.9), RatingBand::Unacceptable);
        assert_eq!(RatingBand::from_percentage(50.0), RatingBand::Average);
        assert_eq!(RatingBand::from_percentage(59.9), RatingBand::Average);
        assert_eq!(RatingBand::from_percentage(60.0), RatingBand::Satisfactory);
        assert_eq!(RatingBand::from_percentage(79.9), RatingBand::Satisfactory);
        assert_eq!(RatingBand::from_percentage(80.0), RatingBand::Exceptional);
    }

    #[test]
    fn test_discrepancy() {
        assert!(is_discrepancy(Some(1.0), Some(2.0)));
        assert!(is_discrepancy(Some(3.0), Some(1.0)));
        assert!(!is_discrepancy(Some(2.0), Some(2.5)));
        assert!(!is_discrepancy(Some(2.0), None));
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating("rating", 0.0, 5.0).is_ok());
        assert!(validate_rating("rating", 5.0, 5.0).is_ok());
        assert!(validate_rating("rating", -0.5, 5.0).is_err());
        assert!(validate_rating("rating", 5.01, 5.0).is_err());
        assert!(validate_rating("rating", f64::NAN, 5.0).is_err());
        assert!(validate_optional_rating("rating", None, 5.0).is_ok());
    }

    #[test]
    fn test_scorecard_flags_disagreement() {
        let review = fixtures::manager_review(1, 1, 20, AssessmentStatus::Submitted);
        let mut assessment = fixtures::self_assessment(1, 1, 10, AssessmentStatus::Submitted);
        assessment.technical_skills_rating = Some(5.0);

        let card = Scorecard::build(
            1,
            &SectionWeights::default(),
            5.0,
            Some(&review),
            Some(&assessment),
        );

        let technical = &card.sections[1];
        assert_eq!(technical.section, Section::TechnicalSkills);
        assert!(technical.discrepancy);
        assert_eq!(card.discrepancy_count, 1);
        assert!(card.manager_score.is_some());
        assert!(card.band.is_some());
    }

    #[test]
    fn test_scorecard_without_review() {
        let card = Scorecard::build(1, &SectionWeights::default(), 5.0, None, None);
        assert_eq!(card.manager_score, None);
        assert_eq!(card.band, None);
        assert_eq!(card.discrepancy_count, 0);
    }

    #[test]
    fn test_overall_rating_from_review() {
        let review = fixtures::manager_review(1, 1, 20, AssessmentStatus::Submitted);
        // 4*30 + 3*25 + 3*15 + 4*15 + 3*15 = 345, over 100
        assert_eq!(overall_rating(&review, &SectionWeights::default()), Some(3.45));
    }
}
