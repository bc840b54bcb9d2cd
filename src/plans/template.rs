//! Template plan generator — deterministic local plan synthesis.

use async_trait::async_trait;
use tracing::debug;

use crate::error::GenerationError;
use crate::onboarding::model::{FitnessGoal, FitnessLevel, OnboardingAnswers, WorkoutEnvironment};

use super::PlanGenerator;
use super::model::{Exercise, PersonalizedPlan};

/// Exercise name and repetition target.
type Movement = (&'static str, &'static str);

const STRENGTH_GYM: &[Movement] = &[
    ("Barbell Back Squat", "6-10"),
    ("Bench Press", "6-10"),
    ("Romanian Deadlift", "8-10"),
    ("Lat Pulldown", "8-12"),
    ("Overhead Press", "8-10"),
    ("Seated Cable Row", "10-12"),
    ("Leg Press", "10-12"),
    ("Cable Face Pull", "12-15"),
];

const STRENGTH_BODYWEIGHT: &[Movement] = &[
    ("Push-up", "8-15"),
    ("Bulgarian Split Squat", "8-12"),
    ("Pike Push-up", "6-10"),
    ("Glute Bridge", "12-15"),
    ("Inverted Row", "8-12"),
    ("Plank", "45s"),
    ("Step-up", "10-12"),
    ("Diamond Push-up", "6-12"),
];

const CONDITIONING_GYM: &[Movement] = &[
    ("Rowing Machine Intervals", "60s"),
    ("Kettlebell Swing", "15"),
    ("Box Jump", "10"),
    ("Battle Ropes", "30s"),
    ("Assault Bike Sprint", "20s"),
    ("Walking Lunge", "12"),
    ("Burpee", "10"),
    ("Sled Push", "20m"),
];

const CONDITIONING_BODYWEIGHT: &[Movement] = &[
    ("Jumping Jacks", "45s"),
    ("Burpee", "8-12"),
    ("Mountain Climbers", "30s"),
    ("Squat Jump", "12"),
    ("High Knees", "30s"),
    ("Skater Hops", "20"),
    ("Plank Jacks", "30s"),
    ("Bear Crawl", "20m"),
];

const ENDURANCE_OUTDOOR: &[Movement] = &[
    ("Easy Run", "10 min"),
    ("Tempo Run", "8 min"),
    ("Hill Repeats", "6"),
    ("Strides", "4x20s"),
    ("Walking Lunge", "20"),
    ("Single-leg Calf Raise", "15"),
    ("Cooldown Jog", "5 min"),
    ("Side Plank", "30s"),
];

const MOBILITY: &[Movement] = &[
    ("Cat-Cow", "10"),
    ("World's Greatest Stretch", "5 per side"),
    ("Hip Flexor Stretch", "45s"),
    ("Thoracic Rotation", "8 per side"),
    ("Downward Dog", "30s"),
    ("Pigeon Pose", "45s"),
    ("Hamstring Floss", "10"),
    ("Child's Pose", "60s"),
];

/// Builds plans from fixed exercise pools keyed by goal and environment.
///
/// Only the primary goal is mandatory; every other answer falls back to a
/// conservative default so a partially answered flow still gets a plan.
#[derive(Debug, Clone, Default)]
pub struct TemplatePlanGenerator;

impl TemplatePlanGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Build a plan synchronously.
    pub fn build(&self, answers: &OnboardingAnswers) -> Result<PersonalizedPlan, GenerationError> {
        let goal = answers
            .primary_goal
            .ok_or_else(|| GenerationError::MissingAnswer {
                field: "primaryGoal".to_string(),
            })?;
        let level = answers.fitness_level.unwrap_or(FitnessLevel::Beginner);
        let environment = answers
            .workout_environment
            .unwrap_or(WorkoutEnvironment::Home);
        let days = answers.days_per_week.unwrap_or(3).clamp(1, 7);
        let minutes = answers.available_minutes.unwrap_or(30).max(10);

        let pool = exercise_pool(goal, environment);
        // Roughly one movement per ten minutes of session time
        let count = usize::from(minutes / 10).clamp(3, pool.len());
        let sets = match level {
            FitnessLevel::Beginner => 2,
            FitnessLevel::Intermediate => 3,
            FitnessLevel::Advanced => 4,
        };
        let rest_seconds = rest_for(goal);

        let exercises = pool
            .iter()
            .take(count)
            .map(|(name, reps)| Exercise {
                name: (*name).to_string(),
                sets,
                reps: (*reps).to_string(),
                rest_seconds,
            })
            .collect();

        Ok(PersonalizedPlan {
            title: format!("{} {}", level_title(level), goal_title(goal)),
            description: format!(
                "{days} {session} per week focused on {focus}, designed for {place}.",
                session = if days == 1 { "session" } else { "sessions" },
                focus = goal_focus(goal),
                place = environment_label(environment),
            ),
            workouts_per_week: days,
            duration: format!("{minutes} min"),
            exercises,
        })
    }
}

#[async_trait]
impl PlanGenerator for TemplatePlanGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(
        &self,
        answers: OnboardingAnswers,
    ) -> Result<PersonalizedPlan, GenerationError> {
        let plan = self.build(&answers)?;
        debug!(
            title = %plan.title,
            exercises = plan.exercises.len(),
            "Built template plan"
        );
        Ok(plan)
    }
}

fn exercise_pool(goal: FitnessGoal, environment: WorkoutEnvironment) -> &'static [Movement] {
    use FitnessGoal::*;
    use WorkoutEnvironment::*;
    match (goal, environment) {
        (BuildMuscle, Gym | Mixed) => STRENGTH_GYM,
        (BuildMuscle, Home | Outdoors) => STRENGTH_BODYWEIGHT,
        (ImproveEndurance, Outdoors) => ENDURANCE_OUTDOOR,
        (LoseWeight | StayActive | ImproveEndurance, Gym) => CONDITIONING_GYM,
        (LoseWeight | StayActive | ImproveEndurance, _) => CONDITIONING_BODYWEIGHT,
        (IncreaseFlexibility, _) => MOBILITY,
    }
}

fn rest_for(goal: FitnessGoal) -> Option<u16> {
    match goal {
        FitnessGoal::BuildMuscle => Some(90),
        FitnessGoal::LoseWeight => Some(30),
        FitnessGoal::ImproveEndurance => Some(45),
        FitnessGoal::StayActive => Some(60),
        FitnessGoal::IncreaseFlexibility => None,
    }
}

fn level_title(level: FitnessLevel) -> &'static str {
    match level {
        FitnessLevel::Beginner => "Beginner",
        FitnessLevel::Intermediate => "Intermediate",
        FitnessLevel::Advanced => "Advanced",
    }
}

fn goal_title(goal: FitnessGoal) -> &'static str {
    match goal {
        FitnessGoal::LoseWeight => "Fat Burn",
        FitnessGoal::BuildMuscle => "Strength Builder",
        FitnessGoal::ImproveEndurance => "Endurance Plan",
        FitnessGoal::IncreaseFlexibility => "Mobility Flow",
        FitnessGoal::StayActive => "Active Living",
    }
}

fn goal_focus(goal: FitnessGoal) -> &'static str {
    match goal {
        FitnessGoal::LoseWeight => "high-intensity conditioning",
        FitnessGoal::BuildMuscle => "progressive strength training",
        FitnessGoal::ImproveEndurance => "aerobic capacity",
        FitnessGoal::IncreaseFlexibility => "mobility and range of motion",
        FitnessGoal::StayActive => "general fitness",
    }
}

fn environment_label(environment: WorkoutEnvironment) -> &'static str {
    match environment {
        WorkoutEnvironment::Home => "training at home",
        WorkoutEnvironment::Gym => "a fully equipped gym",
        WorkoutEnvironment::Outdoors => "training outdoors",
        WorkoutEnvironment::Mixed => "home and gym sessions",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(goal: FitnessGoal) -> OnboardingAnswers {
        OnboardingAnswers {
            primary_goal: Some(goal),
            fitness_level: Some(FitnessLevel::Intermediate),
            workout_environment: Some(WorkoutEnvironment::Gym),
            available_minutes: Some(45),
            days_per_week: Some(4),
            ..Default::default()
        }
    }

    #[test]
    fn builds_plan_from_answers() {
        let plan = TemplatePlanGenerator::new()
            .build(&answers(FitnessGoal::BuildMuscle))
            .unwrap();

        assert_eq!(plan.title, "Intermediate Strength Builder");
        assert_eq!(plan.workouts_per_week, 4);
        assert_eq!(plan.duration, "45 min");
        assert_eq!(plan.exercises.len(), 4);
        assert_eq!(plan.exercises[0].name, "Barbell Back Squat");
        assert!(plan.exercises.iter().all(|e| e.sets == 3));
        assert!(plan.exercises.iter().all(|e| e.rest_seconds == Some(90)));
        assert!(plan.description.starts_with("4 sessions per week"));
    }

    #[test]
    fn missing_goal_is_an_error() {
        let mut input = answers(FitnessGoal::LoseWeight);
        input.primary_goal = None;

        let err = TemplatePlanGenerator::new().build(&input).unwrap_err();
        assert!(matches!(err, GenerationError::MissingAnswer { ref field } if field == "primaryGoal"));
    }

    #[test]
    fn defaults_fill_unanswered_preferences() {
        let input = OnboardingAnswers {
            primary_goal: Some(FitnessGoal::IncreaseFlexibility),
            ..Default::default()
        };

        let plan = TemplatePlanGenerator::new().build(&input).unwrap();
        assert_eq!(plan.title, "Beginner Mobility Flow");
        assert_eq!(plan.workouts_per_week, 3);
        assert_eq!(plan.duration, "30 min");
        assert_eq!(plan.exercises.len(), 3);
        assert!(plan.exercises.iter().all(|e| e.rest_seconds.is_none()));
    }

    #[test]
    fn exercise_count_is_bounded_by_pool() {
        let mut input = answers(FitnessGoal::ImproveEndurance);
        input.workout_environment = Some(WorkoutEnvironment::Outdoors);
        input.available_minutes = Some(240);
        input.days_per_week = Some(1);

        let plan = TemplatePlanGenerator::new().build(&input).unwrap();
        assert_eq!(plan.exercises.len(), ENDURANCE_OUTDOOR.len());
        assert!(plan.description.starts_with("1 session per week"));
    }

    #[tokio::test]
    async fn generate_matches_build() {
        let generator = TemplatePlanGenerator::new();
        let input = answers(FitnessGoal::StayActive);
        let built = generator.build(&input).unwrap();
        let generated = generator.generate(input).await.unwrap();
        assert_eq!(built, generated);
        assert_eq!(generator.name(), "template");
    }
}
