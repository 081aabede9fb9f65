use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SphereGenConfig;
use crate::math::hsv_to_rgb;
use crate::types::SphereData;

const DIELECTRIC_SPECULAR: f32 = 0.04;

/// Scatter non-overlapping spheres over a disc on the ground plane
///
/// Rejected placements are redrawn until `max_count` spheres fit or the
/// attempt budget runs out, in which case the shorter set is returned.
pub fn generate_spheres(config: &SphereGenConfig) -> Vec<SphereData> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let target = config.max_count as usize;
    let budget = config.attempt_budget();
    let [rmin, rmax] = config.radius_range;

    let mut spheres: Vec<SphereData> = Vec::with_capacity(target);
    let mut attempts = 0u32;

    while spheres.len() < target && attempts < budget {
        attempts += 1;

        let radius = rng.gen_range(rmin..=rmax);
        let disc = random_in_disc(&mut rng, config.placement_radius);
        let candidate = SphereData::new(Vec3::new(disc.x, radius, disc.y), radius);

        if spheres.iter().any(|other| other.overlaps(&candidate)) {
            continue;
        }

        spheres.push(assign_material(&mut rng, candidate, config));
    }

    if spheres.len() < target {
        log::warn!(
            "Placed {} of {} spheres after {} attempts",
            spheres.len(),
            target,
            attempts
        );
    } else {
        log::debug!("Placed {} spheres in {} attempts", spheres.len(), attempts);
    }

    spheres
}

/// Uniform point in a disc of radius `radius`
fn random_in_disc(rng: &mut StdRng, radius: f32) -> glam::Vec2 {
    let r = radius * rng.gen::<f32>().sqrt();
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    glam::Vec2::new(r * theta.cos(), r * theta.sin())
}

fn assign_material(rng: &mut StdRng, sphere: SphereData, config: &SphereGenConfig) -> SphereData {
    let color = hsv_to_rgb(rng.gen(), rng.gen(), rng.gen());
    let c: f32 = rng.gen();

    if c < config.emission_chance {
        let value = rng.gen_range(3.0..=8.0);
        let emission = hsv_to_rgb(rng.gen(), 1.0, value);
        return sphere.with_emission(emission);
    }

    let [smin, smax] = config.smoothness_range;
    let sphere = sphere.with_smoothness(rng.gen_range(smin..=smax));

    if c < config.emission_chance + config.metal_chance {
        sphere.with_specular(color)
    } else {
        sphere
            .with_albedo(color)
            .with_specular([DIELECTRIC_SPECULAR; 3])
    }
}
