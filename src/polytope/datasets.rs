//! Point sets that once broke incremental hull construction, replayed one insertion at a time.

use glam::DVec3;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use super::ConvexPolytope;
use crate::Error;

struct Dataset {
    name: &'static str,
    epsilon: f64,
    points: &'static [[f64; 3]],
    troublesome: [f64; 3],
    // Whether the recorded order ends with a solid rather than a polygon.
    solid: bool,
}

const NEAR_COINCIDENT_CLUSTER: Dataset = Dataset {
    name: "near coincident cluster",
    epsilon: 1.0e-3,
    points: &[
        [0.1727226445760459, 0.3408246844828842, 0.0707692371805856],
        [-0.0010094559634557, 0.1846852819495834, -0.0004136019841320],
        [0.0131019603409140, 0.0679884843470001, 0.0053682349594210],
        [0.0268762363673278, 0.0420820755879367, 0.0110119362210409],
        [0.0382545893376212, 0.0262443294907677, 0.0151346721330367],
        [0.0442214133931064, 0.0188148816283424, 0.0181187342317446],
        [0.0878487223095894, -0.0176017339231975, 0.0359940474533526],
        [0.0317197072764835, 0.0339730913830635, 0.0146770460780876],
    ],
    troublesome: [0.0356799421574458, 0.0305305995258588, 0.0121379970533146],
    solid: true,
};

const SLIVER_BELOW_THIN_FACE: Dataset = Dataset {
    name: "sliver below a thin face",
    epsilon: 1.0e-3,
    points: &[
        [0.1075136584776464, -0.4824945590361311, 0.0090899461159321],
        [0.5607657881997890, 0.4040329322380422, 0.0474110068485305],
        [0.0289073412127943, 0.0078295230557014, -0.0147523787325835],
        [0.0043375074277710, -0.1974921037188990, 0.0003667227899621],
        [0.0139072921615079, -0.0447432688724709, 0.0011758183858351],
        [0.0186428968993924, -0.0235249738131959, 0.0012995156961376],
        [0.0212072625303128, -0.0130016538284213, 0.0026586776633881],
        [0.0341784903074217, 0.0292151862876490, 0.0028896852699534],
        [0.0643309020398054, 0.0996995467973626, 0.0054389780927482],
        [0.0269036070083187, 0.0083216605291816, 0.0078200543380451],
    ],
    troublesome: [0.0325313915792233, 0.0068659303400010, -0.0421477673824605],
    solid: true,
};

const NEARLY_COLLINEAR_RUN: Dataset = Dataset {
    name: "nearly collinear run",
    epsilon: 5.0e-4,
    points: &[
        [0.25923025651672880, -1.32459442213312100, 0.33731064563758340],
        [-0.58211725366830260, -0.18145508297583146, -0.75745150010666570],
        [-0.29186699291394436, -0.26463480549211205, -0.37977759673184330],
        [-0.15759191168890652, -0.36628560982904357, -0.20505873887300530],
        [-0.14713791925305353, -0.37644945730058765, -0.19100593449992065],
        [-0.14153660446287397, -0.38162347173657220, -0.18434170307648423],
        [-0.12585187210813410, -0.39752753793187856, -0.16375857049215160],
        [-0.09496404628807320, -0.43099089641061805, -0.12356730343211364],
        [-0.03597410587601624, -0.50432786022543690, -0.04680953929654707],
    ],
    troublesome: [-0.13693975331059360, -0.38652881789871840, -0.17763839169767880],
    solid: false,
};

const NEW_FACES_NEXT_TO_REMOVED_ONES: Dataset = Dataset {
    name: "new faces next to removed ones",
    epsilon: 1.0e-2,
    points: &[
        [0.42651861137013536, 0.29801909203948130, -0.50881487394525300],
        [-0.20516265604483996, -1.22116838270320940, 0.24474854834209914],
        [-0.15474743628494347, -0.19414762426986742, 0.18460577144275080],
        [0.09567299040224675, 0.16701603647134378, -0.11413298096209190],
        [1.25251552911340270, -0.77979707379684860, 0.18358441780536028],
        [-0.42349443545899990, -0.75484408613651910, -1.17104055750426640],
        [0.66343852027333500, -0.21204323532349700, 0.37617790738248347],
        [-0.48038709090787757, -0.20046079757003776, -0.56864140285513080],
        [0.26413164476960427, -0.03607115324095866, 0.25419883203236570],
        [-0.28904627974853190, -0.03294277079647379, -0.20572540856203970],
        [0.02663658174361427, 0.00806765192311998, 0.10847859247578451],
        [-0.10798349555768538, 0.05234735820899628, -0.08040989111998509],
        [0.01968789268608773, 0.08783884515805285, -0.01547486359495420],
    ],
    troublesome: [-0.12185888684659330, -0.04755688773206634, 0.06109223839806777],
    solid: true,
};

const SPIRAL_WITH_COARSE_EPSILON: Dataset = Dataset {
    name: "spiral with a coarse epsilon",
    epsilon: 1.0e-2,
    points: &[
        [-0.97083141752365850, 0.19270232253646270, -1.10314697851813780],
        [0.08735078445224298, -1.63277627043767500, 0.09925590808079998],
        [-0.16861590228562445, -0.35729391130264250, -0.19159672810234674],
        [-0.35048289420867120, -0.10822871051009664, -0.39825054977597630],
        [-0.25480704371353974, -0.22482735589148084, -0.28953494427973680],
        [-0.21045139648732920, -0.28918214661603340, -0.23913402262165895],
        [-0.18920976292038977, -0.32278223301503760, -0.21499734609348364],
        [-0.26251174735750926, -0.21437817652630936, -0.29828972949971044],
        [-0.21408984752431032, -0.28361727533457450, -0.24326836169998278],
        [-0.19097303137237798, -0.31991844716892740, -0.21700093212295768],
        [-0.25532530152410793, -0.22411807334799222, -0.29012383595290490],
        [-0.21069657245417367, -0.28880546074366414, -0.23941261386019497],
        [-0.18932870793247086, -0.32258861213242257, -0.21513250223734293],
        [-0.26202498230546567, -0.21503232293794655, -0.29773662276369195],
        [-0.21386038394086704, -0.28396664073018063, -0.24300762430112366],
        [-0.19086194785992644, -0.32009845157381284, -0.21687470892949090],
        [-0.25577615488337163, -0.22350179846019480, -0.29063613655908904],
        [-0.21090980920004387, -0.28847804640993530, -0.23965491284606855],
        [-0.18943214279826670, -0.32242029058484610, -0.21525003435633305],
        [-0.26160192186689590, -0.21560151221163665, -0.29725590295121050],
        [-0.21366090718484270, -0.28427052340751540, -0.24278096073773303],
        [-0.19076536817251855, -0.32025499828839680, -0.21676496605945483],
        [-0.25616834945327020, -0.22296627726528990, -0.29108178461917344],
        [-0.21109526438785820, -0.28819344177455190, -0.23986564255056098],
        [-0.18952208758489730, -0.32227395694270733, -0.21535224252176488],
        [-0.26123421207556220, -0.21609673816089336, -0.29683805997600940],
        [-0.21348747937756680, -0.28453483575594035, -0.24258392070106327],
        [-0.19068143614879580, -0.32039114237603810, -0.21666951473614948],
        [-0.25650935309177320, -0.22250088499806486, -0.29146956412627790],
        [-0.21125677344005106, -0.28794603693798404, -0.24004871998837785],
        [-0.18959954084944286, -0.32214673477981360, -0.21544179390074947],
        [-0.26091744042974535, -0.21652758125062954, -0.29647234178060020],
        [-0.21333273792329100, -0.28476472339561754, -0.24241610814400594],
        [-0.19062152548312090, -0.32050954055667260, -0.21657502502991666],
        [-0.25675701987444710, -0.22209640957841460, -0.29184993243613800],
        [-0.21146931819101095, -0.28773093222510954, -0.24014454369490168],
        [-0.18941766249809594, -0.32203584875844776, -0.21573941078587810],
        [-0.26157550750578480, -0.21690377434253066, -0.29533185660364370],
        [-0.21190304601336580, -0.28495523356869720, -0.24342425492789554],
        [-0.19493169094055962, -0.32052879613810250, -0.21277662508582130],
    ],
    troublesome: [-0.24069598189087021, -0.22216401323722800, -0.30617162217711513],
    solid: true,
};

const RECORDED: [Dataset; 5] = [
    NEAR_COINCIDENT_CLUSTER,
    SLIVER_BELOW_THIN_FACE,
    NEARLY_COLLINEAR_RUN,
    NEW_FACES_NEXT_TO_REMOVED_ONES,
    SPIRAL_WITH_COARSE_EPSILON,
];

// Surfaces the hull's debug events when a replay fails.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

// Inserts `points` in order, checking the mesh after every step.
fn replay(name: &str, epsilon: f64, points: &[DVec3]) -> ConvexPolytope {
    let mut polytope = ConvexPolytope::with_epsilon(epsilon);

    for (i, &p) in points.iter().enumerate() {
        polytope.add_vertex(p).unwrap();

        if let Err(e) = polytope.validate() {
            panic!("{name}: invalid mesh after point {i} ({p}): {e}");
        }
    }

    polytope
}

fn assert_contains_all(name: &str, polytope: &ConvexPolytope, points: &[DVec3], tolerance: f64) {
    for (i, &p) in points.iter().enumerate() {
        assert!(
            polytope.is_point_inside(p, tolerance),
            "{name}: point {i} ({p}) is {} outside the hull",
            polytope.signed_distance(p)
        );
    }
}

#[test]
fn recorded_datasets() {
    init_logging();

    for dataset in RECORDED {
        let mut points: Vec<DVec3> = dataset.points.iter().copied().map(DVec3::from).collect();
        points.push(DVec3::from(dataset.troublesome));

        let polytope = replay(dataset.name, dataset.epsilon, &points);

        assert_eq!(polytope.is_full_dimensional(), dataset.solid, "{}", dataset.name);
        if dataset.solid {
            assert!(polytope.volume() > 0.0, "{}", dataset.name);
        }
        assert_contains_all(dataset.name, &polytope, &points, 10.0 * dataset.epsilon);
    }
}

#[test]
fn recorded_datasets_in_any_order() {
    let mut rng = StdRng::seed_from_u64(2019);

    for dataset in RECORDED {
        let mut points: Vec<DVec3> = dataset.points.iter().copied().map(DVec3::from).collect();
        points.push(DVec3::from(dataset.troublesome));

        for _ in 0..10 {
            points.shuffle(&mut rng);

            let polytope = replay(dataset.name, dataset.epsilon, &points);
            assert_contains_all(dataset.name, &polytope, &points, 10.0 * dataset.epsilon);
        }
    }
}

#[test]
fn near_duplicates_collapse() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut points = Vec::new();

    for x in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for z in [-1.0, 1.0] {
                let corner = DVec3::new(x, y, z);
                points.push(corner);

                for _ in 0..3 {
                    let jitter = DVec3::new(
                        rng.gen_range(-1.0e-12..1.0e-12),
                        rng.gen_range(-1.0e-12..1.0e-12),
                        rng.gen_range(-1.0e-12..1.0e-12),
                    );
                    points.push(corner + jitter);
                }
            }
        }
    }
    points.shuffle(&mut rng);

    let polytope = replay("near duplicates", ConvexPolytope::DEFAULT_EPSILON, &points);

    assert_eq!(polytope.num_vertices(), 8);
    assert_eq!(polytope.num_faces(), 6);
    assert_contains_all("near duplicates", &polytope, &points, 1.0e-9);
}

#[test]
fn jittered_coplanar_grid() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut points = Vec::new();

    for i in 0..10 {
        for j in 0..10 {
            let z = rng.gen_range(-1.0e-11..1.0e-11);
            points.push(DVec3::new(0.1 * i as f64, 0.1 * j as f64, z));
        }
    }

    let flat = replay("coplanar grid", ConvexPolytope::DEFAULT_EPSILON, &points);
    assert!(!flat.is_full_dimensional());
    assert_eq!(flat.num_faces(), 1);
    assert_eq!(flat.num_vertices(), 4);
    assert_contains_all("coplanar grid", &flat, &points, 1.0e-9);

    points.push(DVec3::new(0.45, 0.45, 1.0));
    let pyramid = replay("coplanar grid", ConvexPolytope::DEFAULT_EPSILON, &points);
    assert_eq!(pyramid.num_vertices(), 5);
    assert_eq!(pyramid.num_faces(), 5);
    assert_contains_all("coplanar grid", &pyramid, &points, 1.0e-9);
}

#[test]
fn points_on_cube_boundary() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut points = Vec::new();

    for _ in 0..60 {
        // Pin one or two coordinates to the boundary: face and edge points.
        let mut p = DVec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let axis = rng.gen_range(0..3);
        p[axis] = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        if rng.gen_bool(0.3) {
            let other = (axis + 1) % 3;
            p[other] = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        }
        points.push(p);
    }

    for x in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for z in [-1.0, 1.0] {
                points.push(DVec3::new(x, y, z));
            }
        }
    }
    points.shuffle(&mut rng);

    let polytope = replay("cube boundary", ConvexPolytope::DEFAULT_EPSILON, &points);

    assert_eq!(polytope.num_vertices(), 8);
    assert_eq!(polytope.num_faces(), 6);
    assert!(polytope
        .vertices()
        .all(|v| v.position().abs() == DVec3::ONE));
    assert_contains_all("cube boundary", &polytope, &points, 1.0e-9);
}

#[test]
fn collinear_points() {
    let mut rng = StdRng::seed_from_u64(17);
    let direction = DVec3::new(1.0, 2.0, -0.5);
    let mut points: Vec<DVec3> = (0..30)
        .map(|_| rng.gen_range(-3.0..3.0) * direction)
        .collect();
    points.shuffle(&mut rng);

    let segment = replay("collinear", ConvexPolytope::DEFAULT_EPSILON, &points);
    assert_eq!(segment.num_vertices(), 2);
    assert_eq!(segment.num_faces(), 1);
    assert_contains_all("collinear", &segment, &points, 1.0e-9);

    points.push(DVec3::new(0.0, 0.0, 1.0));
    let triangle = replay("collinear", ConvexPolytope::DEFAULT_EPSILON, &points);
    assert_eq!(triangle.num_vertices(), 3);
    assert_eq!(triangle.num_faces(), 1);
}

#[test]
fn points_on_sphere() {
    let mut rng = StdRng::seed_from_u64(23);
    let points: Vec<DVec3> = (0..300)
        .map(|_| {
            let theta = rng.gen_range(0.0..std::f64::consts::TAU);
            let z: f64 = rng.gen_range(-1.0..1.0);
            let r = (1.0 - z * z).sqrt();
            DVec3::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect();

    let polytope = replay("sphere", ConvexPolytope::DEFAULT_EPSILON, &points);

    assert_contains_all("sphere", &polytope, &points, 1.0e-9);
    assert!(polytope
        .vertices()
        .all(|v| (v.position().length() - 1.0).abs() < 1.0e-12));
    assert!(polytope.volume() < 4.0 / 3.0 * std::f64::consts::PI);
}

// Inserts `points` one by one and checks the mesh and every accepted point after each step.
fn grow_and_check(name: &str, epsilon: f64, points: &[DVec3]) {
    let tolerance = 10.0 * epsilon;
    let mut polytope = ConvexPolytope::with_epsilon(epsilon);
    let mut accepted = Vec::with_capacity(points.len());

    for (i, &p) in points.iter().enumerate() {
        let before: Vec<DVec3> = polytope.vertices().map(|v| v.position()).collect();

        match polytope.add_vertex(p) {
            Ok(_) => accepted.push(p),
            Err(Error::DegenerateHorizon) => {
                let after: Vec<DVec3> = polytope.vertices().map(|v| v.position()).collect();
                assert_eq!(before, after, "{name}: rejected point {i} changed the mesh");
            }
            Err(e) => panic!("{name}: point {i} ({p}) failed: {e}"),
        }

        if let Err(e) = polytope.validate() {
            panic!("{name}: invalid mesh after point {i} ({p}): {e}");
        }

        if polytope.is_full_dimensional() {
            assert_eq!(
                polytope.num_vertices() + polytope.num_faces(),
                polytope.num_edges() + 2,
                "{name}: Euler's formula fails after point {i}"
            );
        }

        for (j, &q) in accepted.iter().enumerate() {
            let d = polytope.distance(q);
            assert!(d <= tolerance, "{name}: point {j} is {d} outside after point {i}");
        }
    }
}

#[test]
fn nearly_flat_slabs() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(2024);

    for epsilon in [1.0e-10, 1.0e-6, 1.0e-3] {
        for run in 0..40 {
            let thickness = rng.gen_range(0.5..2.5) * epsilon;
            let points: Vec<DVec3> = (0..16)
                .map(|_| {
                    DVec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-0.5..0.5) * thickness,
                    )
                })
                .collect();

            grow_and_check(&format!("slab {run} at {epsilon:e}"), epsilon, &points);
        }
    }
}

#[test]
fn thin_tetrahedra() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(1987);

    for epsilon in [1.0e-10, 1.0e-6, 1.0e-3] {
        for run in 0..40 {
            let base: Vec<DVec3> = (0..3)
                .map(|_| DVec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0))
                .collect();

            // An apex barely clear of the base, then points scattered through the sliver.
            let weights = DVec3::new(rng.gen(), rng.gen(), rng.gen()) + DVec3::splat(0.1);
            let weights = weights / (weights.x + weights.y + weights.z);
            let foot = base[0] * weights.x + base[1] * weights.y + base[2] * weights.z;
            let height = rng.gen_range(1.0..3.0) * epsilon;
            let apex = foot + DVec3::Z * height;

            let mut points = base.clone();
            points.push(apex);
            for _ in 0..8 {
                let t: f64 = rng.gen_range(-0.2..1.2);
                let s: f64 = rng.gen_range(-0.2..1.2);
                let q = base[0] + (base[1] - base[0]) * t + (base[2] - base[0]) * s;
                points.push(q + DVec3::Z * rng.gen_range(-1.0..2.0) * height);
            }
            points[4..].shuffle(&mut rng);

            grow_and_check(&format!("tetrahedron {run} at {epsilon:e}"), epsilon, &points);
        }
    }
}
