//! End-to-end tests for rationalization.
//!
//! Each test builds a small tree-form function, runs the pass with invariant
//! checks enabled and inspects the resulting linear blocks.

use jit_ir::{
    BlockId, CallArg, CallKind, IntrinsicId, IrError, IrForm, IrFunction, MethodRef, NodeData,
    NodeFlags, NodeId, Oper, VarType,
};
use jit_rationalize::checks::{check_lir, rewrite_is_fixpoint};
use jit_rationalize::{rationalize, RationalizeConfig, RationalizeError, TargetArch, TargetInfo};
use pretty_assertions::assert_eq;

/// Run the pass with checks on, panicking with a dump on failure.
fn rationalize_checked(func: &mut IrFunction, target: &TargetInfo) {
    let config = RationalizeConfig::checked();
    if let Err(e) = rationalize(func, target, &config) {
        panic!(
            "rationalization failed: {}\n{}",
            e,
            jit_ir::pretty::dump_function(func)
        );
    }
    check_lir(func, target).expect("linear checks");
}

fn lir_opers(func: &IrFunction, block: BlockId) -> Vec<Oper> {
    func.lir_nodes(block)
        .expect("linear block")
        .into_iter()
        .map(|id| func.node(id).oper)
        .collect()
}

fn lir(func: &IrFunction, block: BlockId) -> Vec<NodeId> {
    func.lir_nodes(block).expect("linear block")
}

fn user_call(func: &mut IrFunction, method: &str, ret: VarType, args: &[CallArg]) -> NodeId {
    func.call(CallKind::User, MethodRef::new(method), ret, args)
}

// ============================================================================
// Assignments
// ============================================================================

#[test]
fn test_store_local_from_expression() {
    let mut func = IrFunction::new("store_local");
    let x = func.new_local(VarType::Int, Some("x".into()));
    let y = func.new_local(VarType::Int, Some("y".into()));
    let z = func.new_local(VarType::Int, Some("z".into()));
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let y_read = func.lcl_var(y, VarType::Int);
    let z_read = func.lcl_var(z, VarType::Int);
    let add = func.binop(Oper::Add, VarType::Int, y_read, z_read);
    let asg = func.assign(dst, add);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(func.form(), IrForm::Linear);
    assert_eq!(lir(&func, block), vec![y_read, z_read, add, asg]);

    let store = func.node(asg);
    assert_eq!(store.oper, Oper::StoreLclVar);
    assert_eq!(store.ty, VarType::Int);
    assert_eq!(store.operands, vec![add]);
    assert_eq!(store.local().map(|l| l.lcl_num), Some(x));
    assert!(store.flags.contains(NodeFlags::VAR_DEF));
    assert!(!func.node(dst).is_linked());
}

#[test]
fn test_store_local_field_keeps_field_payload() {
    let mut func = IrFunction::new("store_field");
    let s = func.new_local(VarType::Struct, None);
    let block = func.new_block();

    let dst = func.lcl_fld(s, VarType::Int, 4, jit_ir::FieldSeq::Field("b".into()));
    let one = func.cns_int(VarType::Int, 1);
    let asg = func.assign(dst, one);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    let store = func.node(asg);
    assert_eq!(store.oper, Oper::StoreLclFld);
    assert_eq!(store.local().map(|l| l.offset), Some(4));
    assert!(store.flags.contains(NodeFlags::VAR_USEASG));
    assert_eq!(lir_opers(&func, block), vec![Oper::CnsInt, Oper::StoreLclFld]);
}

#[test]
fn test_store_through_pointer() {
    let mut func = IrFunction::new("store_ind");
    let p = func.new_local(VarType::Byref, Some("p".into()));
    let v = func.new_local(VarType::Int, Some("v".into()));
    let block = func.new_block();

    let p_read = func.lcl_var(p, VarType::Byref);
    let ind = func.ind(VarType::Int, p_read);
    func.node_mut(ind).flags.insert(NodeFlags::IND_VOLATILE);
    let v_read = func.lcl_var(v, VarType::Int);
    let asg = func.assign(ind, v_read);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    let nodes = lir(&func, block);
    assert_eq!(nodes.len(), 3);
    assert_eq!(&nodes[..2], &[p_read, v_read]);

    let store = func.node(nodes[2]);
    assert_eq!(store.oper, Oper::StoreInd);
    assert_eq!(store.operands, vec![p_read, v_read]);
    assert!(store.flags.contains(NodeFlags::IND_VOLATILE));
    assert!(store.flags.contains(NodeFlags::ASG));
    assert!(!func.node(ind).is_linked());
    assert!(!func.node(asg).is_linked());
}

#[test]
fn test_store_to_static_field() {
    let mut func = IrFunction::new("store_static");
    let v = func.new_local(VarType::Long, None);
    let block = func.new_block();

    let field = func.cls_var("Counters.total", VarType::Long);
    let v_read = func.lcl_var(v, VarType::Long);
    let asg = func.assign(field, v_read);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![field, v_read, asg]);
    assert_eq!(func.node(field).oper, Oper::ClsVarAddr);
    assert_eq!(func.node(field).ty, VarType::Byref);
    assert_eq!(func.node(asg).oper, Oper::StoreInd);
}

#[test]
fn test_block_copy_becomes_store_blk() {
    let mut func = IrFunction::new("block_copy");
    let p = func.new_local(VarType::Byref, None);
    let s = func.new_local(VarType::Struct, None);
    let block = func.new_block();

    let p_read = func.lcl_var(p, VarType::Byref);
    let dst = func.blk(Oper::Blk, VarType::Struct, p_read, 24);
    let src = func.lcl_var(s, VarType::Struct);
    let asg = func.assign(dst, src);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![p_read, src, dst]);
    let store = func.node(dst);
    assert_eq!(store.oper, Oper::StoreBlk);
    assert_eq!(store.operands, vec![p_read, src]);
    assert_eq!(store.data, NodeData::Blk { size: 24 });
    assert!(store.flags.contains(NodeFlags::ASG));
}

#[test]
fn test_dynamic_block_init_keeps_size_last() {
    let mut func = IrFunction::new("dyn_init");
    let p = func.new_local(VarType::Byref, None);
    let n = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let p_read = func.lcl_var(p, VarType::Byref);
    let size = func.lcl_var(n, VarType::Int);
    let dst = func.dyn_blk(p_read, size);
    let zero = func.cns_int(VarType::Int, 0);
    let asg = func.assign(dst, zero);
    func.node_mut(asg).flags.insert(NodeFlags::BLK_INIT);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    let store = func.node(dst);
    assert_eq!(store.oper, Oper::StoreDynBlk);
    assert_eq!(store.operands, vec![p_read, zero, size]);
    assert!(store.flags.contains(NodeFlags::BLK_INIT));
    assert_eq!(lir(&func, block).last(), Some(&dst));
}

#[test]
fn test_reverse_ops_assignment_stores_after_value() {
    let mut func = IrFunction::new("reverse");
    let p = func.new_local(VarType::Byref, None);
    let v = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let p_read = func.lcl_var(p, VarType::Byref);
    let ind = func.ind(VarType::Int, p_read);
    let v_read = func.lcl_var(v, VarType::Int);
    let one = func.cns_int(VarType::Int, 1);
    let add = func.binop(Oper::Add, VarType::Int, v_read, one);
    let asg = func.assign(ind, add);
    func.node_mut(asg).flags.insert(NodeFlags::REVERSE_OPS);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    let nodes = lir(&func, block);
    assert_eq!(&nodes[..4], &[v_read, one, add, p_read]);
    let store = func.node(nodes[4]);
    assert_eq!(store.oper, Oper::StoreInd);
    assert!(store.flags.contains(NodeFlags::REVERSE_OPS));
}

// ============================================================================
// Address-of, comma, box, nop
// ============================================================================

#[test]
fn test_address_of_local_as_call_argument() {
    let mut func = IrFunction::new("addr_arg");
    let x = func.new_local(VarType::Int, Some("x".into()));
    let block = func.new_block();

    let x_read = func.lcl_var(x, VarType::Int);
    let addr = func.addr(x_read);
    let call = user_call(&mut func, "Sink.Take", VarType::Void, &[CallArg::Early(addr)]);
    func.add_statement(block, call, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![x_read, call]);
    let local_addr = func.node(x_read);
    assert_eq!(local_addr.oper, Oper::LclVarAddr);
    assert_eq!(local_addr.ty, VarType::Byref);

    let list = func.node(call).op1().unwrap();
    assert_eq!(func.node(list).op1(), Some(x_read));
    let table = &func.node(call).call().unwrap().arg_table;
    assert_eq!(table.entry_by_arg_num(0).map(|e| e.node), Some(x_read));
    assert!(!table.references(addr));
}

#[test]
fn test_address_of_indirection_cancels() {
    let mut func = IrFunction::new("addr_ind");
    let p = func.new_local(VarType::Byref, None);
    let q = func.new_local(VarType::Byref, None);
    let block = func.new_block();

    let dst = func.lcl_var(q, VarType::Byref);
    let p_read = func.lcl_var(p, VarType::Byref);
    let ind = func.ind(VarType::Int, p_read);
    let addr = func.addr(ind);
    let asg = func.assign(dst, addr);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![p_read, asg]);
    assert_eq!(func.node(asg).operands, vec![p_read]);
}

#[test]
fn test_top_level_comma_drops_pure_side() {
    let mut func = IrFunction::new("comma");
    let y = func.new_local(VarType::Int, Some("y".into()));
    let block = func.new_block();

    let y_read = func.lcl_var(y, VarType::Int);
    let one = func.cns_int(VarType::Int, 1);
    let pure = func.binop(Oper::Add, VarType::Int, y_read, one);
    let effect = user_call(&mut func, "Log.Flush", VarType::Void, &[]);
    let comma = func.comma(pure, effect);
    func.add_statement(block, comma, None).unwrap();
    assert_eq!(func.local(y).ref_count, 1);

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![effect]);
    assert_eq!(func.local(y).ref_count, 0);
    for node in [y_read, one, pure, comma] {
        assert!(!func.node(node).is_linked(), "{node} should be unlinked");
    }
}

#[test]
fn test_comma_dropping_local_address_releases_reference() {
    let mut func = IrFunction::new("comma_addr");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let x_read = func.lcl_var(x, VarType::Int);
    let addr = func.addr(x_read);
    let effect = user_call(&mut func, "Log.Flush", VarType::Void, &[]);
    let comma = func.comma(addr, effect);
    func.add_statement(block, comma, None).unwrap();
    assert_eq!(func.local(x).ref_count, 1);

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![effect]);
    assert_eq!(func.node(x_read).oper, Oper::LclVarAddr);
    assert_eq!(func.local(x).ref_count, 0);
}

#[test]
fn test_comma_value_replaces_comma() {
    let mut func = IrFunction::new("comma_value");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let side = user_call(&mut func, "Log.Flush", VarType::Void, &[]);
    let two = func.cns_int(VarType::Int, 2);
    let comma = func.comma(side, two);
    let asg = func.assign(dst, comma);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![side, two, asg]);
    assert_eq!(func.node(asg).operands, vec![two]);
}

#[test]
fn test_box_and_nop_wrappers_disappear() {
    let mut func = IrFunction::new("wrappers");
    let o = func.new_local(VarType::Ref, None);
    let r = func.new_local(VarType::Ref, None);
    let block = func.new_block();

    let dst = func.lcl_var(r, VarType::Ref);
    let o_read = func.lcl_var(o, VarType::Ref);
    let boxed = func.box_node(o_read);
    let nop = func.nop(VarType::Ref, Some(boxed));
    let asg = func.assign(dst, nop);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![o_read, asg]);
    assert_eq!(func.node(asg).operands, vec![o_read]);
}

#[test]
fn test_replaced_argument_repoints_table() {
    let mut func = IrFunction::new("arg_fixup");
    let y = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let one = func.cns_int(VarType::Int, 1);
    let y_read = func.lcl_var(y, VarType::Int);
    let wrapped = func.nop(VarType::Int, Some(y_read));
    let call = user_call(
        &mut func,
        "Sink.Pair",
        VarType::Void,
        &[CallArg::Early(one), CallArg::Early(wrapped)],
    );
    func.add_statement(block, call, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    let table = &func.node(call).call().unwrap().arg_table;
    assert_eq!(table.entry_by_arg_num(0).map(|e| e.node), Some(one));
    assert_eq!(table.entry_by_arg_num(1).map(|e| e.node), Some(y_read));
    assert!(!table.references(wrapped));
    assert_eq!(lir(&func, block), vec![one, y_read, call]);
}

#[test]
fn test_late_argument_keeps_binding_through_flag() {
    let mut func = IrFunction::new("late_arg");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let x_read = func.lcl_var(x, VarType::Int);
    let addr = func.addr(x_read);
    let call = user_call(&mut func, "Sink.Take", VarType::Void, &[CallArg::Late(addr)]);
    func.add_statement(block, call, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![x_read, call]);
    assert!(func.node(x_read).flags.contains(NodeFlags::LATE_ARG));
    let entry = func.node(call).call().unwrap().arg_table.entry_by_arg_num(0).cloned();
    assert_eq!(entry.map(|e| (e.node, e.is_late)), Some((addr, true)));
}

#[test]
fn test_aggregate_argument_list_keeps_table_entry() {
    let mut func = IrFunction::new("aggregate_arg");
    let o = func.new_local(VarType::Ref, None);
    let block = func.new_block();

    let o_read = func.lcl_var(o, VarType::Ref);
    let boxed = func.box_node(o_read);
    let one = func.cns_int(VarType::Int, 1);
    let fields = func.arg_list(&[boxed, one], true).unwrap();
    let tail = func.node(fields).op2().unwrap();
    let call = user_call(&mut func, "Sink.Take", VarType::Void, &[CallArg::Early(fields)]);
    func.add_statement(block, call, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![o_read, one, tail, fields, call]);
    assert_eq!(func.node(fields).operands, vec![o_read, tail]);
    let table = &func.node(call).call().unwrap().arg_table;
    assert_eq!(table.entry_by_arg_num(0).map(|e| e.node), Some(fields));
    assert!(!func.node(boxed).is_linked());
}

// ============================================================================
// Wrappers above calls
// ============================================================================

#[test]
fn test_nop_above_comma_yielding_call() {
    let mut func = IrFunction::new("nop_comma_call");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let zero = func.cns_int(VarType::Int, 0);
    let call = user_call(&mut func, "Foo.Get", VarType::Int, &[]);
    let comma = func.comma(zero, call);
    let nop = func.nop(VarType::Int, Some(comma));
    let asg = func.assign(dst, nop);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![call, asg]);
    assert_eq!(func.node(asg).operands, vec![call]);
    assert!(!func.node(zero).is_linked());
}

#[test]
fn test_nop_above_boxed_call() {
    let mut func = IrFunction::new("nop_box_call");
    let x = func.new_local(VarType::Ref, None);
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Ref);
    let call = user_call(&mut func, "Foo.Make", VarType::Ref, &[]);
    let boxed = func.box_node(call);
    let nop = func.nop(VarType::Ref, Some(boxed));
    let asg = func.assign(dst, nop);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![call, asg]);
    assert_eq!(func.node(asg).operands, vec![call]);
}

#[test]
fn test_nop_above_intrinsic_rewritten_as_call() {
    let mut func = IrFunction::new("nop_cos");
    let a = func.new_local(VarType::Double, None);
    let r = func.new_local(VarType::Double, None);
    let block = func.new_block();

    let dst = func.lcl_var(r, VarType::Double);
    let a_read = func.lcl_var(a, VarType::Double);
    let cos = func.intrinsic(
        IntrinsicId::Cos,
        VarType::Double,
        MethodRef::new("System.Math.Cos"),
        vec![a_read],
    );
    let nop = func.nop(VarType::Double, Some(cos));
    let asg = func.assign(dst, nop);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir_opers(&func, block), vec![Oper::LclVar, Oper::Call, Oper::StoreLclVar]);
    let call = lir(&func, block)[1];
    assert_eq!(func.node(asg).operands, vec![call]);
    let table = &func.node(call).call().unwrap().arg_table;
    assert_eq!(table.entry_by_arg_num(0).map(|e| e.node), Some(a_read));
}

// ============================================================================
// Intrinsics
// ============================================================================

#[test]
fn test_unsupported_intrinsic_becomes_user_call() {
    let mut func = IrFunction::new("sqrt_call");
    let a = func.new_local(VarType::Double, Some("a".into()));
    let r = func.new_local(VarType::Double, None);
    let block = func.new_block();

    let dst = func.lcl_var(r, VarType::Double);
    let a_read = func.lcl_var(a, VarType::Double);
    let sqrt = func.intrinsic(
        IntrinsicId::Sqrt,
        VarType::Double,
        MethodRef::new("System.Math.Sqrt"),
        vec![a_read],
    );
    let outer = user_call(&mut func, "Sink.Consume", VarType::Double, &[CallArg::Early(sqrt)]);
    let outer_list = func.node(outer).op1().unwrap();
    let asg = func.assign(dst, outer);
    func.add_statement(block, asg, None).unwrap();
    assert!(!func.node(outer_list).flags.contains(NodeFlags::CALL));

    let target = TargetInfo::x64().without_native_intrinsic(IntrinsicId::Sqrt);
    rationalize_checked(&mut func, &target);

    let nodes = lir(&func, block);
    assert_eq!(nodes.len(), 4);
    assert_eq!(nodes[0], a_read);
    assert_eq!(nodes[2], outer);
    assert_eq!(nodes[3], asg);

    let helper = func.node(nodes[1]);
    assert_eq!(helper.oper, Oper::Call);
    assert_eq!(helper.ty, VarType::Double);
    let data = helper.call().unwrap();
    assert_eq!(data.kind, CallKind::User);
    assert_eq!(data.method, MethodRef::new("System.Math.Sqrt"));
    assert_eq!(data.arg_table.entry_by_arg_num(0).map(|e| e.node), Some(a_read));

    // Every ancestor of the replaced intrinsic now contains a call.
    for ancestor in [outer_list, outer, asg] {
        assert!(func.node(ancestor).flags.contains(NodeFlags::CALL));
    }
    let outer_table = &func.node(outer).call().unwrap().arg_table;
    assert_eq!(outer_table.entry_by_arg_num(0).map(|e| e.node), Some(nodes[1]));
    assert!(!func.node(sqrt).is_linked());
}

#[test]
fn test_native_intrinsic_stays_an_operator() {
    let mut func = IrFunction::new("sqrt_native");
    let a = func.new_local(VarType::Double, None);
    let r = func.new_local(VarType::Double, None);
    let block = func.new_block();

    let dst = func.lcl_var(r, VarType::Double);
    let a_read = func.lcl_var(a, VarType::Double);
    let sqrt = func.intrinsic(
        IntrinsicId::Sqrt,
        VarType::Double,
        MethodRef::new("System.Math.Sqrt"),
        vec![a_read],
    );
    let asg = func.assign(dst, sqrt);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(lir(&func, block), vec![a_read, sqrt, asg]);
    assert_eq!(func.node(sqrt).oper, Oper::Intrinsic);
}

#[test]
fn test_intrinsic_as_first_node_of_statement() {
    let mut func = IrFunction::new("floor_root");
    let block = func.new_block();

    let two = func.cns_dbl(VarType::Double, 2.5);
    let floor = func.intrinsic(
        IntrinsicId::Floor,
        VarType::Double,
        MethodRef::new("System.Math.Floor"),
        vec![two],
    );
    let call = user_call(&mut func, "Sink.Consume", VarType::Void, &[CallArg::Early(floor)]);
    func.add_statement(block, call, Some(0x20)).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(
        lir_opers(&func, block),
        vec![Oper::IlOffset, Oper::CnsDbl, Oper::Call, Oper::Call]
    );
}

#[test]
fn test_legalization_clears_use_def_markers() {
    let mut func = IrFunction::new("usedef");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let src = func.lcl_var(x, VarType::Int);
    let one = func.cns_int(VarType::Int, 1);
    let add = func.binop(Oper::Add, VarType::Int, src, one);
    func.node_mut(src).flags.insert(NodeFlags::VAR_USEDEF);
    let asg = func.assign(dst, add);
    func.node_mut(dst).flags.insert(NodeFlags::VAR_USEDEF);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert!(!func.node(src).flags.contains(NodeFlags::VAR_USEDEF));
    assert!(!func.node(asg).flags.contains(NodeFlags::VAR_USEDEF));
}

// ============================================================================
// Statics
// ============================================================================

#[test]
fn test_static_read_on_xarch_becomes_load() {
    let mut func = IrFunction::new("static_read");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let field = func.cls_var("Config.limit", VarType::Int);
    let asg = func.assign(dst, field);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    let nodes = lir(&func, block);
    assert_eq!(
        lir_opers(&func, block),
        vec![Oper::ClsVarAddr, Oper::Ind, Oper::StoreLclVar]
    );
    assert_eq!(nodes[0], field);
    assert_eq!(func.node(field).ty, VarType::Byref);

    let load = func.node(nodes[1]);
    assert_eq!(load.ty, VarType::Int);
    assert_eq!(load.operands, vec![field]);
    assert!(load.flags.contains(NodeFlags::IND_NONFAULTING));
    assert!(!load.flags.contains(NodeFlags::EXCEPT));
    assert_eq!(func.node(asg).operands, vec![nodes[1]]);
}

#[test]
fn test_static_read_on_arm64_is_untouched() {
    let mut func = IrFunction::new("static_read_arm");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let field = func.cls_var("Config.limit", VarType::Int);
    let asg = func.assign(dst, field);
    func.add_statement(block, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::arm64());

    assert_eq!(lir(&func, block), vec![field, asg]);
    assert_eq!(func.node(field).oper, Oper::ClsVar);
}

// ============================================================================
// Block structure
// ============================================================================

#[test]
fn test_il_offset_markers_precede_statements() {
    let mut func = IrFunction::new("offsets");
    let x = func.new_local(VarType::Int, None);
    let block = func.new_block();

    for (value, offset) in [(1, Some(0x10)), (2, None), (3, Some(0x18))] {
        let dst = func.lcl_var(x, VarType::Int);
        let cns = func.cns_int(VarType::Int, value);
        let asg = func.assign(dst, cns);
        func.add_statement(block, asg, offset).unwrap();
    }

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert_eq!(
        lir_opers(&func, block),
        vec![
            Oper::IlOffset,
            Oper::CnsInt,
            Oper::StoreLclVar,
            Oper::CnsInt,
            Oper::StoreLclVar,
            Oper::IlOffset,
            Oper::CnsInt,
            Oper::StoreLclVar,
        ]
    );
    let markers: Vec<NodeData> = lir(&func, block)
        .into_iter()
        .filter(|&id| func.node(id).oper == Oper::IlOffset)
        .map(|id| func.node(id).data.clone())
        .collect();
    assert_eq!(markers, vec![NodeData::IlOffset(0x10), NodeData::IlOffset(0x18)]);
}

#[test]
fn test_unused_local_read_is_removed() {
    let mut func = IrFunction::new("dead_read");
    let y = func.new_local(VarType::Int, None);
    let block = func.new_block();

    let read = func.lcl_var(y, VarType::Int);
    func.add_statement(block, read, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert!(lir(&func, block).is_empty());
    assert_eq!(func.local(y).ref_count, 0);
    assert!(!func.node(read).is_linked());
}

#[test]
fn test_empty_and_multiple_blocks() {
    let mut func = IrFunction::new("blocks");
    let x = func.new_local(VarType::Int, None);
    let empty = func.new_block();
    let body = func.new_block();

    let dst = func.lcl_var(x, VarType::Int);
    let cns = func.cns_int(VarType::Int, 7);
    let asg = func.assign(dst, cns);
    func.add_statement(body, asg, None).unwrap();

    rationalize_checked(&mut func, &TargetInfo::x64());

    assert!(lir(&func, empty).is_empty());
    assert_eq!(lir(&func, body), vec![cns, asg]);
    assert!(func.blocks().iter().all(|b| b.is_linear()));
}

#[test]
fn test_rewrite_rules_reach_a_fixpoint() {
    let mut func = IrFunction::new("fixpoint");
    let x = func.new_local(VarType::Int, None);
    let p = func.new_local(VarType::Byref, None);
    let d = func.new_local(VarType::Double, None);
    let o = func.new_local(VarType::Ref, None);
    let block = func.new_block();

    // *p = Sink.Take(&x)
    let x_read = func.lcl_var(x, VarType::Int);
    let addr = func.addr(x_read);
    let call = user_call(&mut func, "Sink.Take", VarType::Int, &[CallArg::Early(addr)]);
    let p_read = func.lcl_var(p, VarType::Byref);
    let ind = func.ind(VarType::Int, p_read);
    let asg = func.assign(ind, call);
    func.add_statement(block, asg, Some(0)).unwrap();

    // (0, Sink.Obj(box S.f))
    let field = func.cls_var("S.f", VarType::Int);
    let boxed = func.box_node(field);
    let effect = user_call(&mut func, "Sink.Obj", VarType::Void, &[CallArg::Early(boxed)]);
    let zero = func.cns_int(VarType::Int, 0);
    let comma = func.comma(zero, effect);
    func.add_statement(block, comma, Some(4)).unwrap();

    // d = NOP(Math.Cos(d))
    let d_dst = func.lcl_var(d, VarType::Double);
    let d_read = func.lcl_var(d, VarType::Double);
    let cos = func.intrinsic(
        IntrinsicId::Cos,
        VarType::Double,
        MethodRef::new("System.Math.Cos"),
        vec![d_read],
    );
    let nop = func.nop(VarType::Double, Some(cos));
    let d_asg = func.assign(d_dst, nop);
    func.add_statement(block, d_asg, None).unwrap();

    // Sink.Pair(late &x, [box o, 1])
    let x_read = func.lcl_var(x, VarType::Int);
    let late = func.addr(x_read);
    let o_read = func.lcl_var(o, VarType::Ref);
    let o_box = func.box_node(o_read);
    let one = func.cns_int(VarType::Int, 1);
    let fields = func.arg_list(&[o_box, one], true).unwrap();
    let pair = user_call(
        &mut func,
        "Sink.Pair",
        VarType::Void,
        &[CallArg::Late(late), CallArg::Early(fields)],
    );
    func.add_statement(block, pair, None).unwrap();

    let target = TargetInfo::x64();
    rationalize_checked(&mut func, &target);

    assert_eq!(rewrite_is_fixpoint(&func, &target), Ok(true));
}

#[test]
fn test_second_run_is_rejected() {
    let mut func = IrFunction::new("twice");
    let block = func.new_block();
    let call = user_call(&mut func, "Log.Flush", VarType::Void, &[]);
    func.add_statement(block, call, None).unwrap();

    let target = TargetInfo::new(TargetArch::X86);
    rationalize_checked(&mut func, &target);
    let before = jit_ir::pretty::dump_function(&func);

    let err = rationalize(&mut func, &target, &RationalizeConfig::default()).unwrap_err();
    assert_eq!(
        err,
        RationalizeError::Ir(IrError::WrongForm {
            expected: IrForm::Tree,
            found: IrForm::Linear,
        })
    );
    assert_eq!(jit_ir::pretty::dump_function(&func), before);
}

/// Passes every argument late, as a register-argument convention would.
struct LateArgsBuilder {
    built: usize,
}

impl jit_ir::CallBuilder for LateArgsBuilder {
    fn build_user_call(
        &mut self,
        func: &mut IrFunction,
        method: MethodRef,
        ret: VarType,
        args: &[NodeId],
    ) -> jit_ir::Result<NodeId> {
        self.built += 1;
        let args: Vec<CallArg> = args.iter().copied().map(CallArg::Late).collect();
        Ok(func.call(CallKind::Helper, method, ret, &args))
    }
}

#[test]
fn test_custom_call_builder_with_late_arguments() {
    let mut func = IrFunction::new("late_helper");
    let a = func.new_local(VarType::Double, None);
    let r = func.new_local(VarType::Double, None);
    let block = func.new_block();

    let dst = func.lcl_var(r, VarType::Double);
    let a_read = func.lcl_var(a, VarType::Double);
    let cos = func.intrinsic(
        IntrinsicId::Cos,
        VarType::Double,
        MethodRef::new("System.Math.Cos"),
        vec![a_read],
    );
    let asg = func.assign(dst, cos);
    func.add_statement(block, asg, None).unwrap();

    let target = TargetInfo::x64();
    let mut builder = LateArgsBuilder { built: 0 };
    jit_rationalize::rationalize_with(
        &mut func,
        &target,
        &mut builder,
        &RationalizeConfig::checked(),
    )
    .unwrap();
    check_lir(&func, &target).unwrap();

    assert_eq!(builder.built, 1);
    assert_eq!(lir_opers(&func, block), vec![Oper::LclVar, Oper::Call, Oper::StoreLclVar]);
    assert!(func.node(a_read).flags.contains(NodeFlags::LATE_ARG));
    let helper = func.node(lir(&func, block)[1]).call().unwrap();
    assert_eq!(helper.kind, CallKind::Helper);
}
