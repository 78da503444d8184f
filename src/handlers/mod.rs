// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (bearer token + role gate per group) → Elevated (SUPER_ADMIN)
//
// Every tier exposes `routes()`; `app::router` merges them and wraps the
// protected and elevated tiers in the identity middleware.

pub mod elevated; // Tier 3: SUPER_ADMIN only (/api/admin/users/*, /api/admin/doctors/*)
pub mod protected; // Tier 2: any authenticated identity, narrowed per group
pub mod public; // Tier 1: no authentication (/api/auth/register, /api/auth/login)
