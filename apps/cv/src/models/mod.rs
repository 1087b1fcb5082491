pub mod facts;

pub use facts::{
    CanonicalData, Education, EducationEntry, ExperienceEntry, JobSpec, Link, Profile,
    ProjectEntry, Skills, SkillsCategory,
};
