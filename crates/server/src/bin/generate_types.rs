use db::{
    filter::FilterCriteria,
    models::{
        category::{Category, CreateCategory},
        procedure::{
            CreateProcedure, PatchProcedure, Procedure, ProcedureColumn, ProcedureWithRelations,
            UpdateProcedureColumn,
        },
        user::{CreateUser, User},
    },
};
use services::services::{
    board::{Board, BoardColumn},
    projection::TaskViewModel,
};
use ts_rs::TS;
use utils::response::ApiResponse;

fn main() {
    let decls = [
        User::decl(),
        CreateUser::decl(),
        Category::decl(),
        CreateCategory::decl(),
        ProcedureColumn::decl(),
        Procedure::decl(),
        ProcedureWithRelations::decl(),
        CreateProcedure::decl(),
        UpdateProcedureColumn::decl(),
        PatchProcedure::decl(),
        FilterCriteria::decl(),
        TaskViewModel::decl(),
        BoardColumn::decl(),
        Board::decl(),
        ApiResponse::<()>::decl(),
    ];

    println!("// This file was generated by `cargo run --bin generate_types`. Do not edit.\n");
    for decl in decls {
        println!("export {decl}\n");
    }
}
