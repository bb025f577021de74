//! WGSL sources

/// One dab: reads the current surface, writes the target surface over the
/// clipped dab area. The mixer mirrors `color::pigment_mix`.
pub const DAB_SHADER: &str = r#"
struct DabParams {
    color: vec4<f32>,
    // cx, cy, radius, mix strength
    center_radius: vec4<f32>,
    // clipped x0, y0, x1, y1
    region: vec4<i32>,
    // unclipped origin x, origin y, span, stamp side
    stamp: vec4<i32>,
};

@group(0) @binding(0) var current_tex: texture_2d<f32>;
@group(0) @binding(1) var target_tex: texture_storage_2d<rgba8unorm, write>;
@group(0) @binding(2) var<uniform> params: DabParams;
@group(0) @binding(3) var stamp_tex: texture_2d<f32>;

const STAMP_ALPHA_EPSILON: f32 = 0.01;
const SUBTRACTIVE_DARKENING: f32 = 0.35;

fn spread(c: vec3<f32>) -> f32 {
    return max(max(c.r, c.g), c.b) - min(min(c.r, c.g), c.b);
}

fn pigment_mix(a: vec3<f32>, b: vec3<f32>, t: f32) -> vec3<f32> {
    if (t <= 0.0) {
        return a;
    }
    if (t >= 1.0) {
        return b;
    }
    let c = mix(a, b, t);
    let pairs = mix(
        vec3<f32>((a.r + a.g) * 0.5, (a.g + a.b) * 0.5, (a.r + a.b) * 0.5),
        vec3<f32>((b.r + b.g) * 0.5, (b.g + b.b) * 0.5, (b.r + b.b) * 0.5),
        t
    );
    let avg = mix((a.r + a.g + a.b) / 3.0, (b.r + b.g + b.b) / 3.0, t);
    let sat = mix(spread(a), spread(b), t);

    let own = 41.0 / 60.0;
    let off = -23.0 / 60.0;
    let r = own * c.r + 0.25 * pairs.x + off * pairs.y + 0.25 * pairs.z + 0.2 * avg;
    let g = own * c.g + 0.25 * pairs.x + 0.25 * pairs.y + off * pairs.z + 0.2 * avg;
    let bl = own * c.b + off * pairs.x + 0.25 * pairs.y + 0.25 * pairs.z + 0.2 * avg;

    let lost = max(sat - spread(c), 0.0);
    let shade = 1.0 - SUBTRACTIVE_DARKENING * lost;
    return clamp(vec3<f32>(r, g, bl) * shade, vec3<f32>(0.0), vec3<f32>(1.0));
}

@compute @workgroup_size(8, 8, 1)
fn cs_dab(@builtin(global_invocation_id) gid: vec3<u32>) {
    let px = params.region.x + i32(gid.x);
    let py = params.region.y + i32(gid.y);
    if (px >= params.region.z || py >= params.region.w) {
        return;
    }

    let cur = textureLoad(current_tex, vec2<i32>(px, py), 0);
    var out = cur;

    let side = params.stamp.w;
    let span = max(params.stamp.z, 1);
    let sx = (px - params.stamp.x) * side / span;
    let sy = (py - params.stamp.y) * side / span;
    let alpha = textureLoad(stamp_tex, vec2<i32>(sx, sy), 0).r;

    if (alpha >= STAMP_ALPHA_EPSILON) {
        let d = distance(vec2<f32>(f32(px), f32(py)), params.center_radius.xy);
        let falloff = 1.0 - smoothstep(0.0, params.center_radius.z, d);
        let amount = falloff * alpha * params.center_radius.w;
        if (amount > 0.0) {
            out = vec4<f32>(pigment_mix(cur.rgb, params.color.rgb, amount), 1.0);
        }
    }

    textureStore(target_tex, vec2<i32>(px, py), out);
}
"#;
