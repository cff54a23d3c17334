// src/furnish/interaction.rs
//! Pointer state machine: pick, drag, stack preview, drop, rotate, delete.
//! Pure over `SceneState`; the Bevy system only feeds it rays and clock time.

use bevy::prelude::*;

use crate::furnish::core::{clamp_to_room_xz, intersect_horizontal, rotated_extent, ItemId, QuarterTurns};
use crate::furnish::placement::{
    find_stack_base, restack_passengers, settle_on_floor, snap_to_wall, stack_if_eligible,
    stack_position, PlacementContext,
};

/// Picking ignores anything farther than this along the pointer ray.
pub const PICK_DISTANCE: f32 = 500.0;

// ---------- Click / double-click ----------

#[derive(Clone, Copy, Debug, PartialEq)]
enum ClickPhase {
    Idle,
    PendingClick { since: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Click {
    Single,
    Double,
}

/// Tells a lone press from the second press of a double-click.
#[derive(Clone, Debug)]
pub struct ClickDebounce {
    window: f64,
    phase: ClickPhase,
}

impl ClickDebounce {
    pub fn new(window: f64) -> Self {
        Self { window, phase: ClickPhase::Idle }
    }

    pub fn press(&mut self, now: f64) -> Click {
        match self.phase {
            ClickPhase::PendingClick { since } if now - since <= self.window => {
                self.phase = ClickPhase::Idle;
                Click::Double
            }
            _ => {
                self.phase = ClickPhase::PendingClick { since: now };
                Click::Single
            }
        }
    }

    pub fn expire(&mut self, now: f64) {
        if let ClickPhase::PendingClick { since } = self.phase {
            if now - since > self.window {
                self.phase = ClickPhase::Idle;
            }
        }
    }
}

// ---------- Drag state ----------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSession {
    pub item: ItemId,
    /// Height of the horizontal plane the pointer is projected onto.
    pub plane_height: f32,
    /// Item position minus the grab point, so the item keeps its offset from the cursor.
    pub offset: Vec3,
}

/// Ghost of where the dragged item would land if dropped now.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StackPreview {
    pub base: ItemId,
    pub position: Vec3,
    pub yaw: QuarterTurns,
    pub size: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragSession),
    PreviewingStack(DragSession, StackPreview),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// A change the scene committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Committed {
    Moved(ItemId),
    Rotated(ItemId),
    Deleted(ItemId),
}

#[derive(Resource, Clone, Debug)]
pub struct InteractionController {
    phase: DragPhase,
    clicks: ClickDebounce,
    /// The press that completed a double-click owns the next release.
    suppress_release: bool,
}

impl InteractionController {
    pub fn new(double_click_window: f64) -> Self {
        Self {
            phase: DragPhase::Idle,
            clicks: ClickDebounce::new(double_click_window),
            suppress_release: false,
        }
    }

    pub fn dragging(&self) -> Option<ItemId> {
        match self.phase {
            DragPhase::Idle => None,
            DragPhase::Dragging(s) | DragPhase::PreviewingStack(s, _) => Some(s.item),
        }
    }

    pub fn preview(&self) -> Option<&StackPreview> {
        match &self.phase {
            DragPhase::PreviewingStack(_, p) => Some(p),
            _ => None,
        }
    }

    pub fn tick(&mut self, now: f64) {
        self.clicks.expire(now);
    }

    pub fn pointer_down(
        &mut self,
        ctx: &mut PlacementContext,
        button: PointerButton,
        ray: Ray3d,
        now: f64,
    ) -> Option<Committed> {
        if self.phase != DragPhase::Idle {
            return None;
        }
        let hit = ctx.state.pick(ray, PICK_DISTANCE)?;

        match button {
            PointerButton::Secondary => delete_item(ctx, hit).then_some(Committed::Deleted(hit)),
            PointerButton::Primary => match self.clicks.press(now) {
                Click::Double => {
                    self.suppress_release = true;
                    rotate_item(ctx, hit).map(Committed::Rotated)
                }
                Click::Single => {
                    self.phase = begin_drag(ctx, hit, ray)
                        .map(DragPhase::Dragging)
                        .unwrap_or_default();
                    None
                }
            },
        }
    }

    pub fn pointer_move(&mut self, ctx: &mut PlacementContext, ray: Ray3d) {
        let session = match self.phase {
            DragPhase::Idle => return,
            DragPhase::Dragging(s) | DragPhase::PreviewingStack(s, _) => s,
        };
        // no hit on the drag plane: keep the last valid point
        let Some(hit) = intersect_horizontal(ray, session.plane_height) else {
            return;
        };
        drag_to(ctx, session, hit + session.offset);

        self.phase = match preview_for(ctx, session.item) {
            Some(preview) => DragPhase::PreviewingStack(session, preview),
            None => DragPhase::Dragging(session),
        };
    }

    pub fn pointer_up(&mut self, ctx: &mut PlacementContext) -> Option<Committed> {
        if std::mem::take(&mut self.suppress_release) {
            return None;
        }
        let session = match std::mem::take(&mut self.phase) {
            DragPhase::Idle => return None,
            DragPhase::Dragging(s) | DragPhase::PreviewingStack(s, _) => s,
        };
        drop_item(ctx, session.item);
        Some(Committed::Moved(session.item))
    }
}

// ---------- Actions ----------

/// Detach `id` from whatever carries it and start dragging it on its floor plane.
fn begin_drag(ctx: &mut PlacementContext, id: ItemId, ray: Ray3d) -> Option<DragSession> {
    ctx.state.unlink(id);
    let item = ctx.state.get(id)?;
    let plane_height = item.half_height();
    let grab = intersect_horizontal(ray, plane_height).unwrap_or(item.position);
    let mut offset = item.position - grab;
    offset.y = 0.0;
    debug!("Furnish: drag start {:?} offset=({:.2}, {:.2})", id, offset.x, offset.z);
    Some(DragSession { item: id, plane_height, offset })
}

/// Move the dragged item toward `target`, keeping it inside the room and on
/// its wall. Anything it carries moves by the same delta.
fn drag_to(ctx: &mut PlacementContext, session: DragSession, target: Vec3) {
    let margin = ctx.settings.clamp_margin;
    let Some(item) = ctx.state.get_mut(session.item) else { return };
    let before = item.position;

    let p = clamp_to_room_xz(ctx.room, target.x, target.z, margin);
    item.position = Vec3::new(p.x, session.plane_height, p.y);
    if let Some(side) = item.wall_side {
        snap_to_wall(item, ctx.room, side, ctx.settings.wall_gap, margin);
    }
    let delta = item.position - before;

    for child in ctx.state.descendants(session.item) {
        if let Some(c) = ctx.state.get_mut(child) {
            c.position += delta;
        }
    }
}

fn preview_for(ctx: &PlacementContext, id: ItemId) -> Option<StackPreview> {
    let state = &*ctx.state;
    let item = state.get(id)?;
    if !ctx.catalog.is_stackable(item.kind) {
        return None;
    }
    let base_id = find_stack_base(state, ctx.catalog, ctx.settings, id)?;
    let base = state.get(base_id)?;
    Some(StackPreview {
        base: base_id,
        position: stack_position(item, base, ctx.settings.stack_gap),
        yaw: base.yaw,
        size: rotated_extent(item.extent, item.scale, base.yaw),
    })
}

/// Commit a drop: furniture settles on the floor; stackable kinds re-probe and
/// stack on what is under them now.
fn drop_item(ctx: &mut PlacementContext, id: ItemId) {
    let gap = ctx.settings.stack_gap;
    let stackable = ctx
        .state
        .get(id)
        .is_some_and(|i| ctx.catalog.is_stackable(i.kind));

    let base = if stackable {
        find_stack_base(ctx.state, ctx.catalog, ctx.settings, id)
    } else {
        None
    };
    match base {
        Some(base) => {
            if let Err(err) = stack_if_eligible(ctx.state, ctx.catalog, id, base, gap) {
                warn!("Furnish: could not stack {:?} on {:?}: {err}", id, base);
                settle_on_floor(ctx.state, id);
            }
        }
        None => settle_on_floor(ctx.state, id),
    }
    restack_passengers(ctx.state, id, gap);
}

/// Quarter-turn the stack `id` belongs to. Returns the item that turned.
fn rotate_item(ctx: &mut PlacementContext, id: ItemId) -> Option<ItemId> {
    let root = ctx.state.root_of(id);
    let margin = ctx.settings.clamp_margin;
    let item = ctx.state.get_mut(root)?;

    item.yaw = item.yaw.turned(1);
    match item.wall_side {
        Some(side) => snap_to_wall(item, ctx.room, side, ctx.settings.wall_gap, margin),
        None => item.position.y = item.half_height(),
    }
    restack_passengers(ctx.state, root, ctx.settings.stack_gap);
    Some(root)
}

/// Remove `id`; whatever rested on it drops to the floor where it stands.
fn delete_item(ctx: &mut PlacementContext, id: ItemId) -> bool {
    let Some((_, orphans)) = ctx.state.remove(id) else {
        return false;
    };
    for child in orphans {
        settle_on_floor(ctx.state, child);
        restack_passengers(ctx.state, child, ctx.settings.stack_gap);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::furnish::core::test_support::approx;
    use crate::furnish::placement::{attach_to_wall, stack_on_top, test_scene::put};
    use crate::furnish::plugin::FurnishSettings;
    use crate::furnish::registry::test_catalog::bundled;
    use crate::furnish::registry::Catalog;
    use crate::furnish::state::{PlacedItem, SceneState};
    use crate::furnish::core::WallSide;
    use crate::room::Room;

    struct World {
        state: SceneState,
        catalog: Catalog,
        room: Room,
        settings: FurnishSettings,
    }

    impl World {
        fn new() -> Self {
            Self {
                state: SceneState::default(),
                catalog: bundled(),
                room: Room::default(),
                settings: FurnishSettings::default(),
            }
        }

        fn ctx(&mut self) -> PlacementContext<'_> {
            PlacementContext {
                state: &mut self.state,
                catalog: &self.catalog,
                room: &self.room,
                settings: &self.settings,
            }
        }

        fn put(&mut self, key: &str, extent: Vec3, at: Vec2) -> ItemId {
            put(&mut self.state, &self.catalog, key, extent, at)
        }
    }

    /// Straight down onto (x, z) from high above.
    fn down_at(x: f32, z: f32) -> Ray3d {
        Ray3d::new(Vec3::new(x, 20.0, z), Dir3::NEG_Y)
    }

    #[test]
    fn debounce_distinguishes_double_from_slow_clicks() {
        let mut d = ClickDebounce::new(0.3);
        assert_eq!(d.press(1.0), Click::Single);
        assert_eq!(d.press(1.2), Click::Double);
        assert!(matches!(d.phase, ClickPhase::Idle));

        assert_eq!(d.press(2.0), Click::Single);
        d.expire(2.5);
        assert!(matches!(d.phase, ClickPhase::Idle));
        assert_eq!(d.press(2.6), Click::Single);
        assert_eq!(d.press(3.0), Click::Single);
    }

    #[test]
    fn drag_keeps_grab_offset_and_clamps() {
        let mut w = World::new();
        let plant = w.put("monstera", Vec3::new(0.6, 1.0, 0.6), Vec2::new(1.0, 1.0));
        let mut ctl = InteractionController::new(0.3);

        // grab 0.2 m off-centre
        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(1.2, 1.0), 0.0);
        assert_eq!(ctl.dragging(), Some(plant));

        ctl.pointer_move(&mut w.ctx(), down_at(3.2, -2.0));
        let p = w.state.get(plant).unwrap().position;
        assert!(approx(p.x, 3.0) && approx(p.z, -2.0) && approx(p.y, 0.5));

        ctl.pointer_move(&mut w.ctx(), down_at(40.0, 0.0));
        assert!(approx(w.state.get(plant).unwrap().position.x, 7.2));

        // horizon ray: item stays put
        ctl.pointer_move(&mut w.ctx(), Ray3d::new(Vec3::new(0.0, 0.5, 0.0), Dir3::X));
        assert!(approx(w.state.get(plant).unwrap().position.x, 7.2));

        assert_eq!(ctl.pointer_up(&mut w.ctx()), Some(Committed::Moved(plant)));
        assert_eq!(ctl.phase, DragPhase::Idle);
    }

    #[test]
    fn wall_items_slide_along_their_wall() {
        let mut w = World::new();
        let mut sofa = PlacedItem::new(crate::furnish::registry::test_catalog::kind(&w.catalog, "sofa"), Vec3::new(2.0, 1.0, 1.0), 1.0);
        attach_to_wall(&mut sofa, &w.room, WallSide::Back, 0.03, 0.3);
        let sofa = w.state.insert(sofa);
        let mut ctl = InteractionController::new(0.3);

        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(0.0, -6.97), 0.0);
        ctl.pointer_move(&mut w.ctx(), down_at(3.0, 0.0));
        let p = w.state.get(sofa).unwrap().position;
        assert!(approx(p.x, 3.0));
        assert!(approx(p.z, -6.97));
        ctl.pointer_up(&mut w.ctx());
        assert!(approx(w.state.get(sofa).unwrap().position.z, -6.97));
    }

    #[test]
    fn drag_over_table_previews_then_stacks() {
        let mut w = World::new();
        let table = w.put("coffee_table", Vec3::new(2.0, 1.0, 2.0), Vec2::new(-3.0, 0.0));
        let plant = w.put("mini_cactus", Vec3::new(0.4, 0.6, 0.4), Vec2::new(2.0, 2.0));
        let mut ctl = InteractionController::new(0.3);

        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(2.0, 2.0), 0.0);
        ctl.pointer_move(&mut w.ctx(), down_at(-3.0, 0.0));
        let preview = *ctl.preview().unwrap();
        assert_eq!(preview.base, table);
        assert!(approx(preview.position.y, 1.0 + 0.3 + 0.02));

        ctl.pointer_up(&mut w.ctx());
        assert!(ctl.preview().is_none());
        let p = w.state.get(plant).unwrap();
        assert_eq!(p.stacked_on(), Some(table));
        assert!(approx(p.position.x, -3.0) && approx(p.position.z, 0.0));
        assert!(approx(p.position.y, 1.32));
    }

    #[test]
    fn dropping_onto_a_vase_leaves_item_on_floor() {
        let mut w = World::new();
        let vase = w.put("flower_vase", Vec3::new(0.6, 1.8, 0.6), Vec2::ZERO);
        let plant = w.put("tillandsia", Vec3::new(0.3, 0.4, 0.3), Vec2::new(4.0, 4.0));
        let mut ctl = InteractionController::new(0.3);

        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(4.0, 4.0), 0.0);
        ctl.pointer_move(&mut w.ctx(), down_at(0.0, 0.0));
        assert!(ctl.preview().is_none());
        ctl.pointer_up(&mut w.ctx());

        let p = w.state.get(plant).unwrap();
        assert_eq!(p.stacked_on(), None);
        assert!(approx(p.position.y, 0.2));
        assert!(w.state.passengers(vase).is_empty());
    }

    #[test]
    fn furniture_never_stacks() {
        let mut w = World::new();
        let _table = w.put("coffee_table", Vec3::new(2.0, 1.0, 2.0), Vec2::ZERO);
        let stand = w.put("plant_table_small", Vec3::new(0.5, 0.45, 0.5), Vec2::new(4.0, 0.0));
        let mut ctl = InteractionController::new(0.3);

        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(4.0, 0.0), 0.0);
        ctl.pointer_move(&mut w.ctx(), down_at(0.0, 0.0));
        assert!(ctl.preview().is_none());
        ctl.pointer_up(&mut w.ctx());
        let s = w.state.get(stand).unwrap();
        assert_eq!(s.stacked_on(), None);
        assert!(approx(s.position.y, 0.225));
    }

    #[test]
    fn picking_up_a_stacked_item_detaches_it() {
        let mut w = World::new();
        let table = w.put("console_table", Vec3::new(1.0, 1.0, 1.0), Vec2::ZERO);
        let vase = w.put("flower_vase", Vec3::new(0.2, 0.4, 0.2), Vec2::ZERO);
        stack_on_top(&mut w.state, vase, table, 0.02).unwrap();
        let mut ctl = InteractionController::new(0.3);

        // top of the vase is nearest along a downward ray
        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(0.0, 0.0), 0.0);
        assert_eq!(ctl.dragging(), Some(vase));
        assert!(w.state.passengers(table).is_empty());
        assert_eq!(w.state.base_of(vase), None);
    }

    #[test]
    fn dragging_a_base_carries_its_passengers() {
        let mut w = World::new();
        let table = w.put("coffee_table", Vec3::ONE, Vec2::ZERO);
        let cactus = w.put("mini_cactus", Vec3::splat(0.6), Vec2::ZERO);
        stack_on_top(&mut w.state, cactus, table, 0.02).unwrap();
        let mut ctl = InteractionController::new(0.3);

        // grab the table by its side, below the cactus
        let side_ray = Ray3d::new(Vec3::new(0.4, 0.25, 10.0), Dir3::NEG_Z);
        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, side_ray, 0.0);
        assert_eq!(ctl.dragging(), Some(table));

        ctl.pointer_move(&mut w.ctx(), down_at(3.0, 0.0));
        let c = w.state.get(cactus).unwrap().position;
        assert!(c.abs_diff_eq(Vec3::new(3.0, 1.32, 0.0), 1e-4), "mid-drag {c}");

        assert_eq!(ctl.pointer_up(&mut w.ctx()), Some(Committed::Moved(table)));
        let t = w.state.get(table).unwrap().position;
        let c = w.state.get(cactus).unwrap().position;
        assert!(t.abs_diff_eq(Vec3::new(3.0, 0.5, 0.0), 1e-4), "table {t}");
        assert!(c.abs_diff_eq(Vec3::new(3.0, 1.32, 0.0), 1e-4), "cactus {c}");
        assert_eq!(w.state.base_of(cactus), Some(table));
    }

    #[test]
    fn double_click_rotates_and_recentres_passenger() {
        let mut w = World::new();
        let board = w.put("sideboard", Vec3::new(2.0, 1.0, 0.6), Vec2::new(1.0, 1.0));
        let tv = w.put("television", Vec3::new(1.2, 0.8, 0.2), Vec2::new(1.0, 1.0));
        stack_on_top(&mut w.state, tv, board, 0.02).unwrap();
        let mut ctl = InteractionController::new(0.3);

        // first press on the sideboard's side starts a drag, release drops it back
        let side_ray = Ray3d::new(Vec3::new(1.9, 0.5, 10.0), Dir3::NEG_Z);
        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, side_ray, 0.0);
        assert_eq!(ctl.pointer_up(&mut w.ctx()), Some(Committed::Moved(board)));

        let done = ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, side_ray, 0.2);
        assert_eq!(done, Some(Committed::Rotated(board)));
        assert_eq!(ctl.dragging(), None);
        // the release of the second press is swallowed
        assert_eq!(ctl.pointer_up(&mut w.ctx()), None);

        let b = w.state.get(board).unwrap().clone();
        let t = w.state.get(tv).unwrap();
        assert_eq!(b.yaw, QuarterTurns::new(1));
        assert!(approx(b.yaw.radians(), std::f32::consts::FRAC_PI_2));
        assert_eq!(t.yaw, b.yaw);
        assert!(approx(t.position.x, b.position.x) && approx(t.position.z, b.position.z));
        assert!(approx(t.position.y, b.world_box().max.y + 0.4 + 0.02));
        assert_eq!(t.stacked_on(), Some(board));
    }

    #[test]
    fn double_click_on_passenger_turns_whole_stack() {
        let mut w = World::new();
        let board = w.put("sideboard", Vec3::new(2.0, 1.0, 0.6), Vec2::ZERO);
        let tv = w.put("television", Vec3::new(1.2, 0.8, 0.2), Vec2::ZERO);
        stack_on_top(&mut w.state, tv, board, 0.02).unwrap();
        let mut ctl = InteractionController::new(0.3);

        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(0.0, 0.0), 0.0);
        ctl.pointer_up(&mut w.ctx());
        // the drop re-stacked the tv, so the second press lands on it again
        assert_eq!(w.state.base_of(tv), Some(board));
        let done = ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(0.0, 0.0), 0.1);
        assert_eq!(done, Some(Committed::Rotated(board)));
        assert_eq!(w.state.get(tv).unwrap().yaw, QuarterTurns::new(1));
    }

    #[test]
    fn rotating_a_wall_item_reseats_it() {
        let mut w = World::new();
        let mut sofa = PlacedItem::new(crate::furnish::registry::test_catalog::kind(&w.catalog, "sofa"), Vec3::new(2.0, 1.0, 1.0), 1.0);
        attach_to_wall(&mut sofa, &w.room, WallSide::Back, 0.03, 0.3);
        let sofa = w.state.insert(sofa);
        let mut ctl = InteractionController::new(0.3);

        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(0.0, -6.97), 0.0);
        ctl.pointer_up(&mut w.ctx());
        ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(0.0, -6.97), 0.1);
        let s = w.state.get(sofa).unwrap();
        // 2 m side now runs along z
        assert!(approx(s.position.z, -7.5 + 1.0 + 0.03));
        assert_eq!(s.wall_side, Some(WallSide::Back));
    }

    #[test]
    fn deleting_a_base_drops_passengers_to_floor() {
        let mut w = World::new();
        let table = w.put("coffee_table", Vec3::new(2.0, 1.0, 2.0), Vec2::ZERO);
        let c1 = w.put("mini_cactus", Vec3::new(0.3, 0.6, 0.3), Vec2::ZERO);
        let c2 = w.put("flower_vase", Vec3::new(0.3, 0.8, 0.3), Vec2::ZERO);
        stack_on_top(&mut w.state, c1, table, 0.02).unwrap();
        stack_on_top(&mut w.state, c2, table, 0.02).unwrap();
        let mut ctl = InteractionController::new(0.3);

        // hit the table from the side, below its passengers
        let side_ray = Ray3d::new(Vec3::new(0.0, 0.5, 10.0), Dir3::NEG_Z);
        let done = ctl.pointer_down(&mut w.ctx(), PointerButton::Secondary, side_ray, 0.0);
        assert_eq!(done, Some(Committed::Deleted(table)));
        assert!(!w.state.contains(table));

        for (id, hh) in [(c1, 0.3), (c2, 0.4)] {
            let c = w.state.get(id).unwrap();
            assert_eq!(c.stacked_on(), None);
            assert!(approx(c.position.y, hh));
        }
    }

    #[test]
    fn clicking_empty_floor_does_nothing() {
        let mut w = World::new();
        let mut ctl = InteractionController::new(0.3);
        assert_eq!(ctl.pointer_down(&mut w.ctx(), PointerButton::Primary, down_at(1.0, 1.0), 0.0), None);
        assert_eq!(ctl.phase, DragPhase::Idle);
        assert_eq!(ctl.pointer_up(&mut w.ctx()), None);
    }
}
